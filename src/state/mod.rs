use crate::config::EnvConfig;
use crate::links::ActionTable;
use crate::models::SessionInfo;
use crate::notify::Notifications;
use crate::rpc::OrmClient;
use crate::share::SharePanel;
use crate::studio::StudioShell;
use crate::viewer::DocViewer;
use leptos::prelude::*;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub config: EnvConfig,
    pub client: Arc<OrmClient>,

    /// Action name → route table used to resolve deep links.
    pub actions: ActionTable,

    pub session: RwSignal<Option<SessionInfo>>,
    pub notifications: Notifications,

    pub shell: StudioShell<OrmClient>,
    pub viewer: DocViewer<OrmClient>,
    pub share: SharePanel<OrmClient>,

    /// Sharing dialog visibility.
    pub share_open: RwSignal<bool>,
}

impl AppState {
    pub fn new(config: EnvConfig) -> Self {
        let client = Arc::new(OrmClient::from_config(&config));
        let notifications = Notifications::new();

        Self {
            shell: StudioShell::new(client.clone(), notifications),
            viewer: DocViewer::new(client.clone(), notifications),
            share: SharePanel::new(client.clone(), notifications),
            config,
            client,
            actions: ActionTable::with_defaults(),
            session: RwSignal::new(None),
            notifications,
            share_open: RwSignal::new(false),
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(EnvConfig::new())
    }
}

#[derive(Clone)]
pub(crate) struct AppContext(pub AppState);
