use std::sync::Arc;

use crate::{
    cart::CartSessions,
    config::AppConfig,
    db::{DbPool, OrmConn, create_orm_conn},
    store::{OrderStore, PgOrderStore},
};

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub orm: OrmConn,
    pub store: Arc<dyn OrderStore>,
    pub carts: CartSessions,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(pool: DbPool, config: AppConfig) -> Self {
        let orm = create_orm_conn(&pool);
        let store = Arc::new(PgOrderStore::new(orm.clone()));
        Self {
            pool,
            orm,
            store,
            carts: CartSessions::new(),
            config: Arc::new(config),
        }
    }
}
