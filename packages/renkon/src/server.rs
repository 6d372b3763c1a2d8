//! The server façade: registration, route installation, and lifecycle.
//!
//! A [`Renkon`] value is owned by the embedder; there is no global state.
//! Endpoints and action types register before `run()` and are frozen for
//! the server's running lifetime. Scenarios stay mutable at any time.
//! `run()` installs one route per endpoint, mounts the scenario and
//! session middlewares in that order, and blocks on the transport until
//! the shutdown handle fires.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use axum::extract::{Request, State};
use axum::http::{Method, StatusCode};
use axum::middleware::{from_fn, from_fn_with_state};
use axum::response::Response;
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::trace::TraceLayer;
use typed_builder::TypedBuilder;

use crate::action::{ActionType, ActionTypeTable, ActionsBuilder};
use crate::endpoint::{Endpoint, EndpointRegistry, EndpointsBuilder};
use crate::error::{error_body, RegistrationError, ServerError};
use crate::id::ScenarioId;
use crate::middleware::{select_scenario, select_session};
use crate::path::{Path, PathCaptures, PathMatcher};
use crate::pipeline::EndpointResponder;
use crate::scenario::{Scenario, ScenarioRegistry, ScenariosBuilder};

/// Transport configuration for the embedded server.
#[derive(Debug, Clone, TypedBuilder)]
pub struct ServerConfig {
    /// Interface to bind. Defaults to `127.0.0.1`.
    #[builder(default = "127.0.0.1".to_string(), setter(into))]
    pub hostname: String,
    /// Port to bind. Defaults to `8080`.
    #[builder(default = 8080)]
    pub port: u16,
    /// Case sensitivity of constant path segments. Defaults to true.
    #[builder(default = true)]
    pub case_sensitive_paths: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Clonable trigger that stops a serving [`Renkon`] gracefully.
#[derive(Clone)]
pub struct ShutdownHandle {
    sender: Arc<watch::Sender<bool>>,
}

impl ShutdownHandle {
    /// Asks the transport to stop accepting and drain.
    pub fn shutdown(&self) {
        let _ = self.sender.send(true);
    }
}

/// An embeddable mock API server.
pub struct Renkon {
    config: ServerConfig,
    endpoints: StdMutex<EndpointRegistry>,
    actions: StdMutex<ActionTypeTable>,
    scenarios: ScenarioRegistry,
    started: AtomicBool,
    serving: AtomicBool,
    shutdown: Arc<watch::Sender<bool>>,
}

impl Renkon {
    /// A server with the given transport configuration and the built-in
    /// action types pre-registered.
    pub fn new(config: ServerConfig) -> Self {
        let (sender, _) = watch::channel(false);
        Self {
            config,
            endpoints: StdMutex::new(EndpointRegistry::new()),
            actions: StdMutex::new(ActionTypeTable::with_builtins()),
            scenarios: ScenarioRegistry::new(),
            started: AtomicBool::new(false),
            serving: AtomicBool::new(false),
            shutdown: Arc::new(sender),
        }
    }

    /// A server with the default configuration.
    pub fn with_defaults() -> Self {
        Self::new(ServerConfig::default())
    }

    /// Registers one endpoint. Fails once routes are installed.
    pub fn add_endpoint(&self, endpoint: Endpoint) -> Result<(), RegistrationError> {
        if self.started.load(Ordering::SeqCst) {
            return Err(RegistrationError::EndpointsWhileRunning);
        }
        self.endpoints
            .lock()
            .expect("endpoint registration lock poisoned")
            .insert(endpoint)
    }

    /// Registers every endpoint a builder accumulated.
    pub fn add_endpoints(&self, builder: EndpointsBuilder) -> Result<(), RegistrationError> {
        for endpoint in builder.build() {
            self.add_endpoint(endpoint)?;
        }
        Ok(())
    }

    /// Registers one action type. Fails once routes are installed.
    pub fn add_action(&self, action_type: Arc<dyn ActionType>) -> Result<(), RegistrationError> {
        if self.started.load(Ordering::SeqCst) {
            return Err(RegistrationError::ActionsWhileRunning);
        }
        self.actions
            .lock()
            .expect("action registration lock poisoned")
            .insert(action_type)
    }

    /// Registers every action type a builder accumulated.
    pub fn add_actions(&self, builder: ActionsBuilder) -> Result<(), RegistrationError> {
        for action_type in builder.build() {
            self.add_action(action_type)?;
        }
        Ok(())
    }

    /// Registers or replaces a scenario. Allowed at any time.
    pub async fn add_scenario(&self, scenario: Scenario) {
        self.scenarios.add(scenario).await;
    }

    /// Registers every scenario a builder accumulated.
    pub async fn add_scenarios(&self, builder: ScenariosBuilder) {
        for scenario in builder.build() {
            self.scenarios.add(scenario).await;
        }
    }

    /// Removes a scenario. Allowed at any time.
    pub async fn remove_scenario(&self, id: &ScenarioId) -> Option<Arc<Scenario>> {
        self.scenarios.remove(id).await
    }

    /// Registers a scenario and makes it the default for requests without
    /// a scenario header. Allowed at any time.
    pub async fn set_default_scenario(&self, scenario: Scenario) {
        self.scenarios.set_default(scenario).await;
    }

    /// The scenario registry, for read-only consumers such as a scenario
    /// builder UI.
    pub fn scenarios(&self) -> &ScenarioRegistry {
        &self.scenarios
    }

    /// Whether the transport is up.
    pub fn is_running(&self) -> bool {
        self.serving.load(Ordering::SeqCst)
    }

    /// A clonable trigger that stops `run()`/`serve()` gracefully.
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            sender: self.shutdown.clone(),
        }
    }

    /// Freezes the endpoint and action registries and installs routes.
    ///
    /// May be called exactly once; the returned router can be mounted in
    /// a host application instead of calling `run()`. Registration of
    /// endpoints and actions fails from this point on.
    pub fn router(&self) -> Result<Router, RegistrationError> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(RegistrationError::AlreadyStarted);
        }

        let endpoints = std::mem::take(
            &mut *self
                .endpoints
                .lock()
                .expect("endpoint registration lock poisoned"),
        );
        let actions = Arc::new(std::mem::take(
            &mut *self
                .actions
                .lock()
                .expect("action registration lock poisoned"),
        ));

        let mut matchers: HashMap<Method, PathMatcher<Dispatch>> = HashMap::new();
        for endpoint in endpoints.iter() {
            tracing::debug!(
                endpoint = %endpoint.id(),
                method = %endpoint.method(),
                pattern = endpoint.pattern(),
                "installing route"
            );
            let responder = Arc::new(EndpointResponder::new(endpoint.clone(), actions.clone()));
            matchers
                .entry(endpoint.method().clone())
                .or_insert_with(|| {
                    PathMatcher::with_case_sensitivity(self.config.case_sensitive_paths)
                })
                .add(endpoint.pattern(), move |captures| {
                    (responder.clone(), captures)
                });
        }

        let state = DispatchState {
            matchers: Arc::new(matchers),
        };

        // Layers run outermost-last: trace, then scenario selection, then
        // session selection, then dispatch.
        Ok(Router::new()
            .fallback(dispatch)
            .with_state(state)
            .layer(from_fn(select_session))
            .layer(from_fn_with_state(self.scenarios.clone(), select_scenario))
            .layer(TraceLayer::new_for_http()))
    }

    /// Serves on a pre-bound listener until the shutdown handle fires.
    ///
    /// Binding the listener first lets a harness use port 0 and read the
    /// local address back.
    pub async fn serve(&self, listener: TcpListener) -> Result<(), ServerError> {
        let router = self.router()?;
        let mut shutdown = self.shutdown.subscribe();

        tracing::info!(addr = %listener.local_addr()?, "renkon listening");
        self.serving.store(true, Ordering::SeqCst);
        let served = axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.changed().await;
            })
            .await;
        self.serving.store(false, Ordering::SeqCst);
        tracing::info!("renkon stopped");
        served?;
        Ok(())
    }

    /// Binds the configured address and serves until shutdown.
    pub async fn run(&self) -> Result<(), ServerError> {
        let address = format!("{}:{}", self.config.hostname, self.config.port);
        let listener = TcpListener::bind(&address).await?;
        self.serve(listener).await
    }
}

type Dispatch = (Arc<EndpointResponder>, PathCaptures);

#[derive(Clone)]
struct DispatchState {
    matchers: Arc<HashMap<Method, PathMatcher<Dispatch>>>,
}

/// Resolves the request against the installed routes, first registered
/// pattern first, and hands it to the endpoint's responder.
async fn dispatch(State(state): State<DispatchState>, request: Request) -> Response {
    let path = Path::new(request.uri().path());
    let resolved = state
        .matchers
        .get(request.method())
        .and_then(|matcher| matcher.parse(&path));

    match resolved {
        Some((responder, captures)) => responder.respond(request, captures).await,
        None => error_body(
            StatusCode::NOT_FOUND,
            "endpoint-not-found",
            format!("no endpoint matches {} {}", request.method(), path),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.hostname, "127.0.0.1");
        assert_eq!(config.port, 8080);
        assert!(config.case_sensitive_paths);
    }

    #[test]
    fn test_registration_freezes_at_route_install() {
        let server = Renkon::with_defaults();
        server
            .add_endpoint(Endpoint::json(Method::GET, "/accounts"))
            .unwrap();
        let _router = server.router().unwrap();

        let err = server
            .add_endpoint(Endpoint::json(Method::GET, "/other"))
            .unwrap_err();
        assert!(matches!(err, RegistrationError::EndpointsWhileRunning));
        assert_eq!(err.to_string(), "cannot add endpoints while running");

        let err = server
            .add_action(Arc::new(crate::actions::WaitType))
            .unwrap_err();
        assert!(matches!(err, RegistrationError::ActionsWhileRunning));
    }

    #[test]
    fn test_routes_install_exactly_once() {
        let server = Renkon::with_defaults();
        let _router = server.router().unwrap();
        assert!(matches!(
            server.router().unwrap_err(),
            RegistrationError::AlreadyStarted
        ));
    }

    #[tokio::test]
    async fn test_scenarios_stay_mutable_after_route_install() {
        let server = Renkon::with_defaults();
        let _router = server.router().unwrap();
        server.add_scenario(Scenario::new("late")).await;
        assert!(server
            .scenarios()
            .get(&ScenarioId::from("late"))
            .await
            .is_some());
    }
}
