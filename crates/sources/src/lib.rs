//! sigmundr-sources: frame layouts and data sources for Sigmundr telemetry.

mod gateway;
mod sensor;
mod sigmundr;

pub use gateway::GatewaySource;
pub use sensor::SensorSource;
pub use sigmundr::{sigmundr_layout, ERROR_FLAGS, SIGMUNDR_LAYOUT_ID};

use sigmundr_core::{BoxedDataSource, SharedSession};

/// Register all built-in layouts with the global registry
pub fn register_all() {
    use sigmundr_core::global_registry_mut;

    global_registry_mut().register_layout(SIGMUNDR_LAYOUT_ID, "Sigmundr", sigmundr_layout);
}

/// One data source per sensor of the session, followed by the gateway status
pub fn sources_for(session: &SharedSession) -> anyhow::Result<Vec<BoxedDataSource>> {
    let ids: Vec<String> = sigmundr_core::read_session(session)
        .decoder()
        .stores()
        .iter()
        .map(|store| store.id().to_string())
        .collect();

    let mut sources: Vec<BoxedDataSource> = Vec::with_capacity(ids.len() + 1);
    for id in ids {
        sources.push(Box::new(SensorSource::new(session.clone(), &id)?));
    }
    sources.push(Box::new(GatewaySource::new(session.clone())));
    Ok(sources)
}
