use anyhow::Result;
use tracing::info;

use crate::Database;

/// Default entries for the intel feed: (code, label, url, category).
const DEFAULT_INTEL_LINKS: &[(&str, &str, &str, &str)] = &[
    ("[REQ_SEC_01]", "Security Advisories", "https://www.cisa.gov/news-events/cybersecurity-advisories", "security"),
    ("[REQ_SEC_02]", "CVE Records", "https://www.cve.org", "intel"),
    ("[OP_LOG_99]", "Operation Logs", "#", "logs"),
    ("[SYS_STAT]", "System Status", "#", "system"),
];

/// Populate the intel feed if it is empty. Safe to call on every startup.
/// Returns the number of links inserted.
pub fn seed_intel_links(db: &Database) -> Result<usize> {
    let inserted = db.with_conn_mut(|conn| {
        let tx = conn.transaction()?;

        let count: i64 = tx.query_row("SELECT COUNT(*) FROM intel_links", [], |r| r.get(0))?;
        if count > 0 {
            return Ok(0);
        }

        for (code, label, url, category) in DEFAULT_INTEL_LINKS {
            tx.execute(
                "INSERT INTO intel_links (code, label, url, category) VALUES (?1, ?2, ?3, ?4)",
                (code, label, url, category),
            )?;
        }
        tx.commit()?;
        Ok(DEFAULT_INTEL_LINKS.len())
    })?;

    if inserted > 0 {
        info!("Seeded {} intel links", inserted);
    }
    Ok(inserted)
}
