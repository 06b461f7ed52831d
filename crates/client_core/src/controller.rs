use std::{future::Future, sync::Arc};

use shared::{
    domain::{ActiveView, InteractionKind, ProductId, UserId},
    protocol::{Product, Recommendation, User},
};
use tokio::{
    runtime::Handle,
    sync::{broadcast, mpsc},
};
use tracing::{debug, info, warn};

use crate::{
    error::{ControllerError, GatewayError},
    gateway::{DataGateway, InteractionEmitter},
    store::{EntityStore, RecommendationsState},
};

const EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    UsersChanged { count: usize },
    ProductsChanged { count: usize },
    SelectionChanged(Option<UserId>),
    ViewChanged(ActiveView),
    RecommendationsChanged {
        user_id: UserId,
        state: RecommendationsState,
    },
}

// A recommendation result is applied only while its ticket is the latest one
// issued and its user is still selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FetchTicket {
    generation: u64,
    user_id: UserId,
}

enum Completion {
    Users(Result<Vec<User>, GatewayError>),
    Products(Result<Vec<Product>, GatewayError>),
    Recommendations {
        ticket: FetchTicket,
        result: Result<Vec<Recommendation>, GatewayError>,
    },
    Interaction {
        user_id: UserId,
        product_id: ProductId,
        kind: InteractionKind,
        result: Result<(), GatewayError>,
    },
}

pub struct SyncController {
    gateway: Arc<dyn DataGateway>,
    emitter: Arc<dyn InteractionEmitter>,
    runtime: Handle,
    store: EntityStore,
    started: bool,
    generation: u64,
    current_fetch: Option<FetchTicket>,
    in_flight: usize,
    completions_tx: mpsc::UnboundedSender<Completion>,
    completions_rx: mpsc::UnboundedReceiver<Completion>,
    events: broadcast::Sender<SyncEvent>,
}

impl SyncController {
    /// Must be called from within a tokio runtime; all fetches are spawned on it.
    pub fn new(gateway: Arc<dyn DataGateway>, emitter: Arc<dyn InteractionEmitter>) -> Self {
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            gateway,
            emitter,
            runtime: Handle::current(),
            store: EntityStore::new(),
            started: false,
            generation: 0,
            current_fetch: None,
            in_flight: 0,
            completions_tx,
            completions_rx,
            events,
        }
    }

    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.events.subscribe()
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    pub fn start(&mut self) {
        if self.started {
            return;
        }
        self.started = true;
        info!("loading users and products");

        let gateway = Arc::clone(&self.gateway);
        self.spawn_completion(
            async move { Completion::Users(gateway.fetch_users().await) },
            |err| Completion::Users(Err(err)),
        );

        let gateway = Arc::clone(&self.gateway);
        self.spawn_completion(
            async move { Completion::Products(gateway.fetch_products().await) },
            |err| Completion::Products(Err(err)),
        );
    }

    pub fn select_user(&mut self, user_id: UserId) -> Result<(), ControllerError> {
        if !self.store.contains_user(user_id) {
            return Err(ControllerError::UnknownUser(user_id));
        }
        if self.store.selected_user_id() == Some(user_id) {
            return Ok(());
        }

        self.store.set_selected_user(user_id);
        self.emit(SyncEvent::SelectionChanged(Some(user_id)));
        self.on_selection_changed();
        Ok(())
    }

    pub fn switch_view(&mut self, view: ActiveView) {
        if self.store.active_view() == view {
            return;
        }

        self.store.set_active_view(view);
        self.emit(SyncEvent::ViewChanged(view));
        // Returning to recommendations always re-arms a fetch so interactions
        // recorded on the products view are reflected.
        if view == ActiveView::Recommendations {
            self.issue_recommendations_fetch();
        }
    }

    /// Returns whether a fetch was issued.
    pub fn refresh(&mut self) -> bool {
        if self.store.active_view() != ActiveView::Recommendations {
            debug!("refresh ignored outside the recommendations view");
            return false;
        }
        self.issue_recommendations_fetch()
    }

    pub fn record_interaction(
        &mut self,
        product_id: ProductId,
        kind: InteractionKind,
    ) -> Result<(), ControllerError> {
        let user_id = self
            .store
            .selected_user_id()
            .ok_or(ControllerError::NoUserSelected)?;

        let emitter = Arc::clone(&self.emitter);
        self.spawn_completion(
            async move {
                let result = emitter.record_interaction(user_id, product_id, kind).await;
                Completion::Interaction {
                    user_id,
                    product_id,
                    kind,
                    result,
                }
            },
            move |err| Completion::Interaction {
                user_id,
                product_id,
                kind,
                result: Err(err),
            },
        );
        Ok(())
    }

    pub async fn process_next(&mut self) -> bool {
        if self.in_flight == 0 {
            return false;
        }
        let Some(completion) = self.completions_rx.recv().await else {
            return false;
        };
        self.in_flight -= 1;
        self.apply(completion);
        true
    }

    pub async fn settle(&mut self) {
        while self.process_next().await {}
    }

    // A panicking task still reports back through `on_abort`, so `in_flight`
    // always returns to zero.
    fn spawn_completion<F, A>(&mut self, task: F, on_abort: A)
    where
        F: Future<Output = Completion> + Send + 'static,
        A: FnOnce(GatewayError) -> Completion + Send + 'static,
    {
        self.in_flight += 1;
        let tx = self.completions_tx.clone();
        let runtime = self.runtime.clone();
        self.runtime.spawn(async move {
            let completion = match runtime.spawn(task).await {
                Ok(completion) => completion,
                Err(err) => {
                    warn!("request task aborted: {err}");
                    on_abort(GatewayError::transport(format!("request task aborted: {err}")))
                }
            };
            let _ = tx.send(completion);
        });
    }

    fn emit(&self, event: SyncEvent) {
        let _ = self.events.send(event);
    }

    fn emit_recommendations_state(&self, user_id: UserId) {
        self.emit(SyncEvent::RecommendationsChanged {
            user_id,
            state: self.store.recommendations_state(),
        });
    }

    fn on_selection_changed(&mut self) {
        // Whatever was fetched belonged to the previous user.
        self.current_fetch = None;
        self.store.reset_recommendations();
        let fetching = self.store.active_view() == ActiveView::Recommendations
            && self.issue_recommendations_fetch();
        if !fetching {
            if let Some(user_id) = self.store.selected_user_id() {
                self.emit_recommendations_state(user_id);
            }
        }
    }

    fn issue_recommendations_fetch(&mut self) -> bool {
        let Some(user_id) = self.store.selected_user_id() else {
            return false;
        };

        self.generation += 1;
        let ticket = FetchTicket {
            generation: self.generation,
            user_id,
        };
        self.current_fetch = Some(ticket);
        self.store.begin_recommendations_load();
        self.emit_recommendations_state(user_id);
        debug!(
            user_id = user_id.0,
            generation = ticket.generation,
            "fetching recommendations"
        );

        let gateway = Arc::clone(&self.gateway);
        self.spawn_completion(
            async move {
                let result = gateway.fetch_recommendations(user_id).await;
                Completion::Recommendations { ticket, result }
            },
            move |err| Completion::Recommendations {
                ticket,
                result: Err(err),
            },
        );
        true
    }

    fn apply(&mut self, completion: Completion) {
        match completion {
            Completion::Users(result) => self.apply_users(result),
            Completion::Products(result) => self.apply_products(result),
            Completion::Recommendations { ticket, result } => {
                self.apply_recommendations(ticket, result)
            }
            Completion::Interaction {
                user_id,
                product_id,
                kind,
                result,
            } => {
                match result {
                    Ok(()) => debug!(
                        user_id = user_id.0,
                        product_id = product_id.0,
                        %kind,
                        "interaction recorded"
                    ),
                    Err(err) => warn!(
                        user_id = user_id.0,
                        product_id = product_id.0,
                        %kind,
                        "failed to record interaction: {err}"
                    ),
                }
                if self.store.active_view() == ActiveView::Recommendations {
                    self.issue_recommendations_fetch();
                }
            }
        }
    }

    fn apply_users(&mut self, result: Result<Vec<User>, GatewayError>) {
        let previous = self.store.selected_user_id();
        match result {
            Ok(users) => {
                info!(count = users.len(), "users loaded");
                self.store.set_users(users);
            }
            Err(err) => {
                warn!("failed to load users: {err}");
                self.store.mark_users_failed();
            }
        }
        self.emit(SyncEvent::UsersChanged {
            count: self.store.users().len(),
        });

        let selected = self.store.selected_user_id();
        if selected != previous {
            self.emit(SyncEvent::SelectionChanged(selected));
            self.on_selection_changed();
        }
    }

    fn apply_products(&mut self, result: Result<Vec<Product>, GatewayError>) {
        match result {
            Ok(products) => {
                info!(count = products.len(), "products loaded");
                self.store.set_products(products);
            }
            Err(err) => {
                warn!("failed to load products: {err}");
                self.store.mark_products_failed();
            }
        }
        self.emit(SyncEvent::ProductsChanged {
            count: self.store.products().len(),
        });
    }

    fn apply_recommendations(
        &mut self,
        ticket: FetchTicket,
        result: Result<Vec<Recommendation>, GatewayError>,
    ) {
        let is_current = self.current_fetch == Some(ticket)
            && self.store.selected_user_id() == Some(ticket.user_id);
        if !is_current {
            debug!(
                user_id = ticket.user_id.0,
                generation = ticket.generation,
                "discarding stale recommendations response"
            );
            return;
        }
        self.current_fetch = None;

        match result {
            Ok(recommendations) => {
                info!(
                    user_id = ticket.user_id.0,
                    count = recommendations.len(),
                    "recommendations loaded"
                );
                self.store.replace_recommendations(recommendations);
            }
            Err(GatewayError::NotFound { detail }) => {
                warn!(
                    user_id = ticket.user_id.0,
                    "recommendations unavailable for unknown user: {detail}"
                );
                self.store.replace_recommendations(Vec::new());
            }
            Err(err) => {
                warn!(
                    user_id = ticket.user_id.0,
                    "failed to load recommendations: {err}"
                );
                self.store.fail_recommendations();
            }
        }
        self.emit_recommendations_state(ticket.user_id);
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
