use crate::cli::{AddUserArgs, StoreArgs};
use crate::server::load_config;
use placement_portal::error::AppError;
use placement_portal::store::Store;
use placement_portal::telemetry;
use placement_portal::users::{NewUser, UserRepository};
use tracing::info;

/// Opens the configured store with migrations applied.
async fn open_store(args: &mut StoreArgs) -> Result<Store, AppError> {
    let config = load_config(args)?;
    telemetry::init(&config.telemetry)?;

    let store = Store::connect(&config.database).await?;
    store.migrate().await?;
    Ok(store)
}

pub(crate) async fn migrate(mut args: StoreArgs) -> Result<(), AppError> {
    let store = open_store(&mut args).await?;
    store.health_check().await?;
    store.close().await;
    println!("Migrations applied");
    Ok(())
}

pub(crate) async fn add_user(mut args: AddUserArgs) -> Result<(), AppError> {
    let store = open_store(&mut args.store).await?;
    let users = UserRepository::new(store.pool().clone());

    let created = users
        .create(NewUser {
            email: args.email,
            first_name: args.first_name,
            last_name: args.last_name,
            role: args.role,
            department: args.department,
            batch_year: args.batch_year,
        })
        .await;
    store.close().await;
    let record = created?;

    info!(user_id = %record.id, role = %record.role, "user provisioned");
    println!(
        "Created {} {} {} <{}> with id {}",
        record.role, record.first_name, record.last_name, record.email, record.id
    );
    Ok(())
}
