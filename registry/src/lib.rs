use std::sync::Arc;

use adapter::database::ConnectionPool;
use adapter::payment::HttpPaymentGateway;
use adapter::redis::RedisClient;
use adapter::repository::audit::AuditLogRepositoryImpl;
use adapter::repository::auth::AuthRepositoryImpl;
use adapter::repository::coupon::CouponRepositoryImpl;
use adapter::repository::health::HealthCheckRepositoryImpl;
use adapter::repository::order::OrderRepositoryImpl;
use adapter::repository::resource::ResourceRepositoryImpl;
use adapter::repository::slot::SlotRepositoryImpl;
use adapter::repository::staff::StaffRepositoryImpl;
use kernel::payment::PaymentGateway;
use kernel::repository::audit::AuditLogRepository;
use kernel::repository::auth::AuthRepository;
use kernel::repository::coupon::CouponRepository;
use kernel::repository::health::HealthCheckRepository;
use kernel::repository::order::OrderRepository;
use kernel::repository::resource::ResourceRepository;
use kernel::repository::slot::SlotRepository;
use kernel::repository::staff::StaffRepository;
use shared::config::{AppConfig, BookingConfig};

#[derive(Clone)]
pub struct AppRegistry {
    health_check_repository: Arc<dyn HealthCheckRepository>,
    resource_repository: Arc<dyn ResourceRepository>,
    slot_repository: Arc<dyn SlotRepository>,
    order_repository: Arc<dyn OrderRepository>,
    coupon_repository: Arc<dyn CouponRepository>,
    audit_log_repository: Arc<dyn AuditLogRepository>,
    auth_repository: Arc<dyn AuthRepository>,
    staff_repository: Arc<dyn StaffRepository>,
    payment_gateway: Arc<dyn PaymentGateway>,
    booking_config: Arc<BookingConfig>,
}

impl AppRegistry {
    pub fn new(pool: ConnectionPool, redis_client: Arc<RedisClient>, app_config: AppConfig) -> Self {
        let health_check_repository = Arc::new(HealthCheckRepositoryImpl::new(pool.clone()));
        let resource_repository = Arc::new(ResourceRepositoryImpl::new(pool.clone()));
        let slot_repository = Arc::new(SlotRepositoryImpl::new(pool.clone()));
        let order_repository = Arc::new(OrderRepositoryImpl::new(pool.clone()));
        let coupon_repository = Arc::new(CouponRepositoryImpl::new(pool.clone()));
        let audit_log_repository = Arc::new(AuditLogRepositoryImpl::new(pool.clone()));
        let auth_repository = Arc::new(AuthRepositoryImpl::new(
            pool.clone(),
            redis_client.clone(),
            app_config.auth.ttl,
        ));
        let staff_repository = Arc::new(StaffRepositoryImpl::new(pool.clone()));
        let payment_gateway = Arc::new(HttpPaymentGateway::new(&app_config.payment));
        Self {
            health_check_repository,
            resource_repository,
            slot_repository,
            order_repository,
            coupon_repository,
            audit_log_repository,
            auth_repository,
            staff_repository,
            payment_gateway,
            booking_config: Arc::new(app_config.booking),
        }
    }

    pub fn health_check_repository(&self) -> Arc<dyn HealthCheckRepository> {
        self.health_check_repository.clone()
    }

    pub fn resource_repository(&self) -> Arc<dyn ResourceRepository> {
        self.resource_repository.clone()
    }

    pub fn slot_repository(&self) -> Arc<dyn SlotRepository> {
        self.slot_repository.clone()
    }

    pub fn order_repository(&self) -> Arc<dyn OrderRepository> {
        self.order_repository.clone()
    }

    pub fn coupon_repository(&self) -> Arc<dyn CouponRepository> {
        self.coupon_repository.clone()
    }

    pub fn audit_log_repository(&self) -> Arc<dyn AuditLogRepository> {
        self.audit_log_repository.clone()
    }

    pub fn auth_repository(&self) -> Arc<dyn AuthRepository> {
        self.auth_repository.clone()
    }

    pub fn staff_repository(&self) -> Arc<dyn StaffRepository> {
        self.staff_repository.clone()
    }

    pub fn payment_gateway(&self) -> Arc<dyn PaymentGateway> {
        self.payment_gateway.clone()
    }

    // 予約ポリシーのスナップショット。ハンドラはこれを
    // 計算関数へ引数として渡す
    pub fn booking_config(&self) -> Arc<BookingConfig> {
        self.booking_config.clone()
    }
}
