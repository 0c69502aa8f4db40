use std::sync::Arc;

use boxoffice_booking::InventoryController;
use boxoffice_store::app_config::BusinessRules;
use boxoffice_store::{EventProducer, RedisClient};

#[derive(Clone)]
pub struct AppState {
    pub controller: Arc<InventoryController>,
    pub kafka: Arc<EventProducer>,
    pub redis: Arc<RedisClient>,
    pub business_rules: BusinessRules,
}
