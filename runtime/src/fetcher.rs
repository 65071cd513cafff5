//! Fetch orchestration.
//!
//! A [`Fetcher`] binds one registered endpoint to one consumer. Every call to
//! [`Fetcher::update`] re-reads the consumer's parameters from the store,
//! runs the pure [`decide`] step, and when a request is due:
//!
//! 1. dispatches `RequestStarted` in the same critical section as the check
//!    (see [`Store::send_if`]), so a second fetcher sharing the endpoint sees
//!    the in-flight URL and skips;
//! 2. runs the network call (or the response override) and the mapper as an
//!    effect;
//! 3. feeds `RequestFinished` back into the store, success or failure.
//!
//! [`Fetcher::render`] turns the current record into one of loading,
//! failure, or content.

use crate::metrics::FetchMetrics;
use crate::{EffectHandle, Store, StoreError};
use endpoint_store_core::decision::{Decision, decide};
use endpoint_store_core::effect::Effect;
use endpoint_store_core::endpoint::Endpoint;
use endpoint_store_core::environment::{Clock, HttpClient};
use endpoint_store_core::error::{ConfigError, FetchError};
use endpoint_store_core::record::{FetchRecord, Payload};
use endpoint_store_core::reducer::Reducer;
use endpoint_store_core::registry::EndpointRegistry;
use endpoint_store_core::slice::{EndpointAction, HasEndpoints};
use std::any::{Any, type_name};
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::time::Instant;

/// What every fetcher needs besides the store: where descriptors come from,
/// how to reach the network, and what time it is.
pub struct EndpointContext<P> {
    registry: Arc<EndpointRegistry<P>>,
    http: Arc<dyn HttpClient>,
    clock: Arc<dyn Clock>,
}

impl<P> EndpointContext<P> {
    /// Bundle the collaborators shared by all fetchers of an application.
    #[must_use]
    pub fn new(
        registry: Arc<EndpointRegistry<P>>,
        http: Arc<dyn HttpClient>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            registry,
            http,
            clock,
        }
    }

    /// The endpoint registry
    #[must_use]
    pub fn registry(&self) -> &EndpointRegistry<P> {
        &self.registry
    }
}

impl<P> Clone for EndpointContext<P> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
            http: Arc::clone(&self.http),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<P> fmt::Debug for EndpointContext<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndpointContext")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

/// How a failed record is rendered.
pub enum FailureView<V> {
    /// [`Render::Error`] carrying the message
    Default,
    /// A caller-supplied view built from the message
    Custom(Arc<dyn Fn(&str) -> V + Send + Sync>),
    /// Render nothing
    Hidden,
}

impl<V> Clone for FailureView<V> {
    fn clone(&self) -> Self {
        match self {
            Self::Default => Self::Default,
            Self::Custom(view) => Self::Custom(Arc::clone(view)),
            Self::Hidden => Self::Hidden,
        }
    }
}

impl<V> fmt::Debug for FailureView<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => f.write_str("FailureView::Default"),
            Self::Custom(_) => f.write_str("FailureView::Custom"),
            Self::Hidden => f.write_str("FailureView::Hidden"),
        }
    }
}

/// Result of rendering a fetcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Render<V> {
    /// Nothing fetched yet, request pending
    Loading,
    /// Default failure view with the error message
    Error(String),
    /// Custom failure view
    Failure(V),
    /// The consumer's output
    Content(V),
    /// Nothing to show (hidden spinner or suppressed failure)
    Nothing,
}

impl<V> Render<V> {
    /// The consumer's output, if content was rendered
    #[must_use]
    pub fn content(self) -> Option<V> {
        match self {
            Self::Content(view) => Some(view),
            _ => None,
        }
    }
}

/// Props handed to the wrapped consumer.
#[derive(Debug)]
pub struct Injected<'a, T> {
    /// Name under which the data is injected (the endpoint name)
    pub name: &'a str,
    /// The endpoint's data
    pub data: Arc<T>,
}

/// Outcome of one [`Fetcher::update`].
#[derive(Debug)]
pub struct Evaluation {
    /// What was decided
    pub decision: Decision,
    /// Tracks the fetch effect when one was started
    pub handle: Option<EffectHandle>,
}

impl Evaluation {
    /// Wait until the started fetch (if any) has been reduced into the store.
    pub async fn wait(&mut self) {
        if let Some(handle) = self.handle.as_mut() {
            handle.wait().await;
        }
    }
}

/// Options for a [`Fetcher`], validated by [`FetcherBuilder::mount`].
pub struct FetcherBuilder<P, V = ()> {
    endpoint_name: String,
    hide_spinner: bool,
    failure: FailureView<V>,
    context: Option<EndpointContext<P>>,
}

impl<P: Clone + Send + Sync + 'static, V> FetcherBuilder<P, V> {
    /// Options for a fetcher of `endpoint_name`.
    #[must_use]
    pub fn new(endpoint_name: impl Into<String>) -> Self {
        Self {
            endpoint_name: endpoint_name.into(),
            hide_spinner: false,
            failure: FailureView::Default,
            context: None,
        }
    }

    /// Render nothing instead of [`Render::Loading`].
    #[must_use]
    pub const fn hide_spinner(mut self, hide: bool) -> Self {
        self.hide_spinner = hide;
        self
    }

    /// Render failures with `view`.
    #[must_use]
    pub fn failure_component<F>(mut self, view: F) -> Self
    where
        F: Fn(&str) -> V + Send + Sync + 'static,
    {
        self.failure = FailureView::Custom(Arc::new(view));
        self
    }

    /// Render nothing on failure.
    #[must_use]
    pub fn without_failure_component(mut self) -> Self {
        self.failure = FailureView::Hidden;
        self
    }

    /// Resolve descriptors, network and time through `context`.
    #[must_use]
    pub fn with_context(mut self, context: EndpointContext<P>) -> Self {
        self.context = Some(context);
        self
    }

    /// Bind the fetcher to `store`, reading parameters through `params`.
    ///
    /// Nothing is dispatched here; the first [`Fetcher::update`] is the mount
    /// evaluation.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::MissingContext`] when no context was supplied
    /// - [`ConfigError::UnknownEndpoint`] when the registry lacks the endpoint
    pub fn mount<S, A, E, R, F>(
        self,
        store: Store<S, A, E, R>,
        params: F,
    ) -> Result<Fetcher<S, A, E, R, P, V>, ConfigError>
    where
        R: Reducer<State = S, Action = A, Environment = E>,
        F: Fn(&S) -> P + Send + Sync + 'static,
    {
        let context = self.context.ok_or_else(|| ConfigError::MissingContext {
            endpoint: self.endpoint_name.clone(),
        })?;
        let endpoint = context.registry.get(&self.endpoint_name)?;

        tracing::debug!(endpoint = %self.endpoint_name, "Fetcher mounted");

        Ok(Fetcher {
            store,
            endpoint,
            http: context.http,
            clock: context.clock,
            params: Arc::new(params),
            last_params: None,
            hide_spinner: self.hide_spinner,
            failure: self.failure,
        })
    }
}

impl<P, V> fmt::Debug for FetcherBuilder<P, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetcherBuilder")
            .field("endpoint_name", &self.endpoint_name)
            .field("hide_spinner", &self.hide_spinner)
            .field("failure", &self.failure)
            .field("has_context", &self.context.is_some())
            .finish()
    }
}

/// One endpoint bound to one consumer.
///
/// `V` is the consumer's view type.
pub struct Fetcher<S, A, E, R, P, V = ()>
where
    R: Reducer<State = S, Action = A, Environment = E>,
{
    store: Store<S, A, E, R>,
    endpoint: Arc<Endpoint<P>>,
    http: Arc<dyn HttpClient>,
    clock: Arc<dyn Clock>,
    params: Arc<dyn Fn(&S) -> P + Send + Sync>,
    last_params: Option<P>,
    hide_spinner: bool,
    failure: FailureView<V>,
}

impl<S, A, E, R, P, V> Fetcher<S, A, E, R, P, V>
where
    R: Reducer<State = S, Action = A, Environment = E> + Send + Sync + 'static,
    S: HasEndpoints + Send + Sync + 'static,
    A: From<EndpointAction> + Clone + Send + 'static,
    E: Send + Sync + 'static,
    P: Clone + Send + Sync + 'static,
{
    /// The bound endpoint
    #[must_use]
    pub fn endpoint(&self) -> &Endpoint<P> {
        &self.endpoint
    }

    /// Parameters seen by the last evaluation; `None` before mount.
    #[must_use]
    pub const fn last_params(&self) -> Option<&P> {
        self.last_params.as_ref()
    }

    /// Evaluate the fetch decision against the current store state.
    ///
    /// The first call is the mount evaluation; later calls compare against
    /// the parameters seen last time.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] if the store no longer accepts actions.
    pub async fn update(&mut self) -> Result<Evaluation, StoreError> {
        let endpoint = Arc::clone(&self.endpoint);
        let selector = Arc::clone(&self.params);
        let old_params = self.last_params.as_ref();

        let ((decision, params), _) = self
            .store
            .send_if(|state| {
                let params = selector(state);
                let initial = FetchRecord::default();
                let record = state.endpoints().get(endpoint.name()).unwrap_or(&initial);
                let decision = decide(record, old_params, &params, &endpoint);

                let action = decision.url().map(|url| {
                    A::from(EndpointAction::RequestStarted {
                        endpoint_name: endpoint.name().to_string(),
                        request_url: url.to_string(),
                    })
                });
                ((decision, params), action)
            })
            .await?;
        self.last_params = Some(params);

        let handle = match &decision {
            Decision::Skip(reason) => {
                tracing::debug!(endpoint = %endpoint.name(), %reason, "Fetch skipped");
                FetchMetrics::record_skipped(endpoint.name(), reason.as_str());
                None
            },
            Decision::Fetch { url } => {
                tracing::debug!(endpoint = %endpoint.name(), %url, "Fetch started");
                Some(self.store.run(self.fetch_effect(url.clone())))
            },
        };

        Ok(Evaluation { decision, handle })
    }

    fn fetch_effect(&self, url: String) -> Effect<A> {
        let endpoint = Arc::clone(&self.endpoint);
        let http = Arc::clone(&self.http);
        let clock = Arc::clone(&self.clock);

        Effect::Future(Box::pin(async move {
            let record = fetch_record(&endpoint, &url, http.as_ref(), clock.as_ref()).await;
            Some(A::from(EndpointAction::RequestFinished {
                endpoint_name: endpoint.name().to_string(),
                record,
            }))
        }))
    }

    /// The endpoint's record as currently stored.
    pub async fn current_record(&self) -> FetchRecord {
        let name = self.endpoint.name();
        self.store.state(|state| state.endpoints().record(name)).await
    }

    /// Apply the render policy to the current record.
    ///
    /// `consumer` is only called when data is present.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::PayloadType`] when the endpoint's data is not a `T`.
    pub async fn render<T, C>(&self, consumer: C) -> Result<Render<V>, ConfigError>
    where
        T: Any + Send + Sync,
        C: FnOnce(Injected<'_, T>) -> V,
    {
        let record = self.current_record().await;
        let typed = record.downcast::<T>().ok_or_else(|| ConfigError::PayloadType {
            endpoint: self.endpoint.name().to_string(),
            expected: type_name::<T>(),
            found: record.data().map_or("nothing", Payload::type_name),
        })?;

        Ok(render_record(
            self.endpoint.name(),
            &typed,
            self.hide_spinner,
            &self.failure,
            consumer,
        ))
    }
}

impl<S, A, E, R, P, V> fmt::Debug for Fetcher<S, A, E, R, P, V>
where
    R: Reducer<State = S, Action = A, Environment = E>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fetcher")
            .field("endpoint", &self.endpoint.name())
            .field("mounted", &self.last_params.is_some())
            .field("hide_spinner", &self.hide_spinner)
            .field("failure", &self.failure)
            .finish_non_exhaustive()
    }
}

/// Render policy over a typed record.
///
/// An error wins; otherwise data is rendered even while a newer request is
/// in flight; with neither, the loading view (or nothing when hidden).
pub fn render_record<T, V, C>(
    name: &str,
    record: &FetchRecord<Arc<T>>,
    hide_spinner: bool,
    failure: &FailureView<V>,
    consumer: C,
) -> Render<V>
where
    C: FnOnce(Injected<'_, T>) -> V,
{
    if let Some(message) = record.error() {
        return match failure {
            FailureView::Default => Render::Error(message.to_string()),
            FailureView::Custom(view) => Render::Failure(view(message)),
            FailureView::Hidden => Render::Nothing,
        };
    }

    match record.data() {
        Some(data) => Render::Content(consumer(Injected {
            name,
            data: Arc::clone(data),
        })),
        None if hide_spinner => Render::Nothing,
        None => Render::Loading,
    }
}

/// Perform one fetch of `endpoint` at `url` and produce its terminal record.
///
/// Uses the response override instead of the network when one is configured.
/// Every failure, a panicking mapper included, ends up in the record's error.
pub async fn fetch_record<P>(
    endpoint: &Endpoint<P>,
    url: &str,
    http: &dyn HttpClient,
    clock: &dyn Clock,
) -> FetchRecord {
    let name = endpoint.name();
    let start = Instant::now();
    FetchMetrics::record_started(name);

    let raw = match endpoint.response_override() {
        Some(raw) => {
            tracing::trace!(endpoint = %name, "Using response override");
            Ok(raw.clone())
        },
        None => http.get_json(url).await,
    };
    let result = raw.and_then(|raw| transform(endpoint, raw));
    FetchMetrics::record_finished(name, result.is_ok(), start.elapsed());

    match result {
        Ok(data) => {
            tracing::info!(endpoint = %name, %url, "Fetch succeeded");
            FetchRecord::succeeded(data, url, clock.now())
        },
        Err(error) => {
            tracing::warn!(endpoint = %name, %url, %error, "Fetch failed");
            FetchRecord::failed(error.to_string(), url, clock.now())
        },
    }
}

fn transform<P>(endpoint: &Endpoint<P>, raw: serde_json::Value) -> Result<Payload, FetchError> {
    catch_unwind(AssertUnwindSafe(|| endpoint.map_response(raw))).unwrap_or_else(|panic| {
        let message = panic
            .downcast_ref::<&str>()
            .map(ToString::to_string)
            .or_else(|| panic.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "mapper panicked".to_string());
        Err(FetchError::Transform(message))
    })
}
