//! The API client: one executor shared by every resource.
//!
//! # Design
//! `Client` owns an `Arc<Executor>` and hands a clone of it to each resource
//! wrapper. Resources hold no state of their own, so they are cheap to clone
//! and can be moved to other threads independently of the client.

use std::sync::Arc;

use tracing::debug;

use crate::config::Config;
use crate::error::ApiError;
use crate::executor::Executor;
use crate::resources::auth::Auth;
use crate::resources::boards::Boards;
use crate::resources::burn_alerts::BurnAlerts;
use crate::resources::columns::Columns;
use crate::resources::datasets::Datasets;
use crate::resources::derived_columns::DerivedColumns;
use crate::resources::markers::Markers;
use crate::resources::queries::Queries;
use crate::resources::query_results::QueryResults;
use crate::resources::recipients::Recipients;
use crate::resources::slos::Slos;
use crate::resources::triggers::Triggers;
use crate::transport::{Transport, UreqTransport};

/// Client for the Honeycomb API.
#[derive(Clone)]
pub struct Client {
    executor: Arc<Executor>,
    auth: Auth,
    boards: Boards,
    burn_alerts: BurnAlerts,
    columns: Columns,
    datasets: Datasets,
    derived_columns: DerivedColumns,
    markers: Markers,
    queries: Queries,
    query_results: QueryResults,
    recipients: Recipients,
    slos: Slos,
    triggers: Triggers,
}

impl Client {
    /// Build a client that talks HTTP through a pooled `ureq` agent.
    pub fn new(config: Config) -> Result<Self, ApiError> {
        let transport = Arc::new(UreqTransport::new(config.timeout));
        Self::with_transport(config, transport)
    }

    /// Build a client over any transport.
    pub fn with_transport(config: Config, transport: Arc<dyn Transport>) -> Result<Self, ApiError> {
        let executor = Arc::new(Executor::new(&config, transport)?);
        debug!(api_url = %executor.base_url(), "client created");
        Ok(Self {
            auth: Auth::new(Arc::clone(&executor)),
            boards: Boards::new(Arc::clone(&executor)),
            burn_alerts: BurnAlerts::new(Arc::clone(&executor)),
            columns: Columns::new(Arc::clone(&executor)),
            datasets: Datasets::new(Arc::clone(&executor)),
            derived_columns: DerivedColumns::new(Arc::clone(&executor)),
            markers: Markers::new(Arc::clone(&executor)),
            queries: Queries::new(Arc::clone(&executor)),
            query_results: QueryResults::new(Arc::clone(&executor)),
            recipients: Recipients::new(Arc::clone(&executor)),
            slos: Slos::new(Arc::clone(&executor)),
            triggers: Triggers::new(Arc::clone(&executor)),
            executor,
        })
    }

    /// Build a client from the process environment.
    pub fn from_env() -> Result<Self, ApiError> {
        Self::new(Config::from_env()?)
    }

    pub fn executor(&self) -> &Arc<Executor> {
        &self.executor
    }

    pub fn auth(&self) -> &Auth {
        &self.auth
    }

    pub fn boards(&self) -> &Boards {
        &self.boards
    }

    pub fn burn_alerts(&self) -> &BurnAlerts {
        &self.burn_alerts
    }

    pub fn columns(&self) -> &Columns {
        &self.columns
    }

    pub fn datasets(&self) -> &Datasets {
        &self.datasets
    }

    pub fn derived_columns(&self) -> &DerivedColumns {
        &self.derived_columns
    }

    pub fn markers(&self) -> &Markers {
        &self.markers
    }

    pub fn queries(&self) -> &Queries {
        &self.queries
    }

    pub fn query_results(&self) -> &QueryResults {
        &self.query_results
    }

    pub fn recipients(&self) -> &Recipients {
        &self.recipients
    }

    pub fn slos(&self) -> &Slos {
        &self.slos
    }

    pub fn triggers(&self) -> &Triggers {
        &self.triggers
    }
}
