// Walks both pagination strategies against the in-memory store

use chrono::{Duration, TimeZone, Utc};
use dpp_store::model::{
    iso_millis, AssetAdministrationShell, AssetInformation, AssetKind, Entity, Environment, Passport, TenantScoped,
};
use dpp_store::{DocumentRepository, EnvironmentService, MemoryDocumentStore, Pagination, PassportRepository};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Debug)
        .init();

    let store = Arc::new(MemoryDocumentStore::new());
    let shells: DocumentRepository<AssetAdministrationShell, _> = DocumentRepository::new(Arc::clone(&store));
    let passports = PassportRepository::create(Arc::clone(&store));
    let environments = EnvironmentService::new(Arc::clone(&store));

    let mut shell_ids = Vec::new();
    for n in 0..5 {
        let shell = AssetAdministrationShell::create(AssetInformation::create(AssetKind::Instance))
            .with_id_short(format!("Shell{}", n));
        shell_ids.push(shells.save(&shell).await?.id().to_string());
    }

    let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    for day in 0..7 {
        let passport = Passport::create("org-demo")
            .with_created_at(start + Duration::days(day))
            .with_environment(Environment::create(shell_ids.clone(), Vec::new(), Vec::new()));
        passports.save(&passport).await?;
    }

    println!("Passports of org-demo, three per page:");
    let mut pagination = Pagination::first(3)?;
    loop {
        let page = passports.find_all_by_organization_id("org-demo", &pagination).await?;
        if page.items.is_empty() {
            break;
        }
        for passport in &page.items {
            println!("  {} created {}", passport.id(), iso_millis::format(&passport.created_at()));
        }
        println!("  cursor: {}", page.cursor().unwrap_or("-"));
        pagination = page.pagination;
    }

    let environment = Environment::create(shell_ids, Vec::new(), Vec::new());
    println!("Shells of one environment, two per page:");
    let mut pagination = Pagination::first(2)?;
    loop {
        let page = environments.shells_page(&environment, &pagination).await?;
        if page.items.is_empty() {
            break;
        }
        for shell in &page.items {
            println!("  {} ({})", shell.id(), shell.id_short().unwrap_or("-"));
        }
        pagination = page.pagination;
    }

    Ok(())
}
