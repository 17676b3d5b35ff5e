use anyhow::Result;
use ksb_db::Database;
use tracing::info;

use crate::config::AdminSeed;

/// One-time startup seeding. Every step checks before inserting, so running
/// it against an already-seeded database changes nothing.
pub fn run(db: &Database, admin: Option<&AdminSeed>) -> Result<()> {
    ksb_db::seed::seed_intel_links(db)?;

    if let Some(admin) = admin {
        seed_admin(db, admin)?;
    }
    Ok(())
}

fn seed_admin(db: &Database, admin: &AdminSeed) -> Result<()> {
    if db.get_user_by_username(&admin.username)?.is_some() {
        return Ok(());
    }

    let hash = ksb_api::auth::hash_password(&admin.password)?;
    match db.create_user(&admin.username, &hash, "Komuta", true)? {
        Some(user) => info!("Seeded admin account '{}' (id={})", user.username, user.id),
        None => info!("Admin account '{}' already exists", admin.username),
    }
    Ok(())
}
