use shared::{
    domain::{ActiveView, UserId},
    protocol::{Product, Recommendation, User},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecommendationsState {
    #[default]
    Idle,
    Loading,
    Loaded,
    Empty,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Uninitialized,
    UsersLoaded,
    Ready,
}

#[derive(Debug, Default, Clone)]
pub struct EntityStore {
    users: Vec<User>,
    products: Vec<Product>,
    recommendations: Vec<Recommendation>,
    recommendations_state: RecommendationsState,
    selected_user_id: Option<UserId>,
    active_view: ActiveView,
    users_settled: bool,
    products_settled: bool,
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn users(&self) -> &[User] {
        &self.users
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn recommendations(&self) -> &[Recommendation] {
        &self.recommendations
    }

    pub fn recommendations_state(&self) -> RecommendationsState {
        self.recommendations_state
    }

    pub fn is_loading_recommendations(&self) -> bool {
        self.recommendations_state == RecommendationsState::Loading
    }

    pub fn selected_user_id(&self) -> Option<UserId> {
        self.selected_user_id
    }

    pub fn selected_user(&self) -> Option<&User> {
        let id = self.selected_user_id?;
        self.users.iter().find(|u| u.id == id)
    }

    pub fn active_view(&self) -> ActiveView {
        self.active_view
    }

    pub fn contains_user(&self, user_id: UserId) -> bool {
        self.users.iter().any(|u| u.id == user_id)
    }

    pub fn phase(&self) -> SessionPhase {
        match (self.users_settled, self.products_settled) {
            (false, _) => SessionPhase::Uninitialized,
            (true, false) => SessionPhase::UsersLoaded,
            (true, true) => SessionPhase::Ready,
        }
    }

    /// Stores the user list and moves the selection to its first entry when
    /// the current selection is missing from it.
    pub(crate) fn set_users(&mut self, users: Vec<User>) {
        self.users = users;
        self.users_settled = true;
        let still_present = self
            .selected_user_id
            .is_some_and(|id| self.contains_user(id));
        if !still_present {
            self.selected_user_id = self.users.first().map(|u| u.id);
        }
    }

    pub(crate) fn mark_users_failed(&mut self) {
        self.users.clear();
        self.users_settled = true;
    }

    pub(crate) fn set_products(&mut self, products: Vec<Product>) {
        self.products = products;
        self.products_settled = true;
    }

    pub(crate) fn mark_products_failed(&mut self) {
        self.products.clear();
        self.products_settled = true;
    }

    pub(crate) fn set_selected_user(&mut self, user_id: UserId) {
        self.selected_user_id = Some(user_id);
    }

    pub(crate) fn set_active_view(&mut self, view: ActiveView) {
        self.active_view = view;
    }

    pub(crate) fn reset_recommendations(&mut self) {
        self.recommendations.clear();
        self.recommendations_state = RecommendationsState::Idle;
    }

    pub(crate) fn begin_recommendations_load(&mut self) {
        self.recommendations_state = RecommendationsState::Loading;
    }

    pub(crate) fn replace_recommendations(&mut self, recommendations: Vec<Recommendation>) {
        self.recommendations_state = if recommendations.is_empty() {
            RecommendationsState::Empty
        } else {
            RecommendationsState::Loaded
        };
        self.recommendations = recommendations;
    }

    pub(crate) fn fail_recommendations(&mut self) {
        self.recommendations.clear();
        self.recommendations_state = RecommendationsState::Failed;
    }
}
