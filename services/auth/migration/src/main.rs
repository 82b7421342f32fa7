use sea_orm_migration::prelude::*;

#[tokio::main]
async fn main() {
    cli::run_cli(test24_auth_migration::Migrator).await;
}
