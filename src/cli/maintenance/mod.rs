//! Offline maintenance commands: `reclaim` and `list`

use tracing::info;

use crate::infrastructure::services::PipelineServiceTrait;

/// Remove (or with `dry_run`, only print) orphaned storage namespaces
pub async fn reclaim(dry_run: bool) -> anyhow::Result<()> {
    let config = super::bootstrap()?;
    let service = crate::build_pipeline_service(&config).await?;

    if dry_run {
        let orphans = service.find_orphans().await?;
        for id in &orphans {
            println!("{}", id);
        }
        info!(count = orphans.len(), "Orphan scan complete (dry run)");
        return Ok(());
    }

    let reclaimed = service.reclaim_orphans().await?;
    for id in &reclaimed {
        println!("{}", id);
    }
    info!(count = reclaimed.len(), "Orphaned storage reclaimed");

    Ok(())
}

pub async fn list() -> anyhow::Result<()> {
    let config = super::bootstrap()?;
    let service = crate::build_pipeline_service(&config).await?;

    for id in service.list_pipelines().await? {
        println!("{}", id);
    }

    Ok(())
}
