//! The client: signs connect requests, opens room sessions, and searches
//! for rooms.

use std::fmt;

use roomwire_protocol::{PropertyMap, RoomSelector};
use roomwire_room::{Query, RoomSummary, SearchRequest, Searcher};
use roomwire_session::{Credential, Session, SessionConfig};
use roomwire_transport::{ConnectRequest, Connector};

use crate::{RoomOption, RoomwireError};

/// Who the client is and where the room authority lives.
#[derive(Clone)]
pub struct ClientConfig {
    /// Room authority endpoint, e.g. `wss://rooms.example.com/v1`.
    pub url: String,
    pub app_id: String,
    pub user_id: String,
    /// Shared secret used to sign the credential. Never sent.
    pub app_key: String,
    pub session: SessionConfig,
}

impl ClientConfig {
    pub fn new(
        url: impl Into<String>,
        app_id: impl Into<String>,
        user_id: impl Into<String>,
        app_key: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            app_id: app_id.into(),
            user_id: user_id.into(),
            app_key: app_key.into(),
            session: SessionConfig::default(),
        }
    }

    #[must_use]
    pub fn session(mut self, session: SessionConfig) -> Self {
        self.session = session;
        self
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("url", &self.url)
            .field("app_id", &self.app_id)
            .field("user_id", &self.user_id)
            .field("app_key", &"<redacted>")
            .field("session", &self.session)
            .finish()
    }
}

/// Opens sessions through a [`Connector`] and answers searches through
/// a [`Searcher`].
///
/// Each create/join/watch call signs a fresh credential and returns a
/// session that has already sent its request. Nothing is dispatched
/// until the session is pumped, so callbacks and RPC handlers registered
/// right after the call see every event.
///
/// ```rust,no_run
/// use roomwire::prelude::*;
///
/// # fn run() -> Result<(), RoomwireError> {
/// let config = ClientConfig::new("wss://rooms.example.com", "my-app", "alice", "secret");
/// let client = Client::new(config, WebSocketConnector, RoomDirectory::new());
///
/// let option = RoomOption::default()
///     .max_players(10)
///     .public_props(PropertyMap::new().with("bbb", 13));
/// let mut session = client.create(&option, &PropertyMap::new())?;
/// session.on_joined(|me, room, _| println!("{me} entered {}", room.id));
/// loop {
///     session.pump();
///     if session.state().is_terminal() {
///         break;
///     }
/// #   break;
/// }
/// # Ok(())
/// # }
/// ```
pub struct Client<K, S> {
    config: ClientConfig,
    connector: K,
    searcher: S,
}

impl<K: Connector, S: Searcher> Client<K, S> {
    pub fn new(config: ClientConfig, connector: K, searcher: S) -> Self {
        Self {
            config,
            connector,
            searcher,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn searcher(&self) -> &S {
        &self.searcher
    }

    pub fn searcher_mut(&mut self) -> &mut S {
        &mut self.searcher
    }

    /// A connect request carrying a freshly signed credential.
    pub fn connect_request(&self) -> ConnectRequest {
        let credential = Credential::generate(&self.config.app_key, &self.config.user_id);
        credential
            .headers(&self.config.app_id)
            .into_iter()
            .fold(ConnectRequest::new(self.config.url.as_str()), |request, (name, value)| {
                request.header(name, value)
            })
    }

    /// Connects without asking for a room yet. The session is in
    /// `Connecting`; follow up with `create`, `join` or `watch` on it.
    pub fn open(&self) -> Result<Session<K::Transport>, RoomwireError> {
        let session = Session::connect(
            &self.connector,
            self.connect_request(),
            self.config.session.clone(),
        )?;
        Ok(session)
    }

    /// Creates a room and enters it as master.
    pub fn create(
        &self,
        option: &RoomOption,
        player_props: &PropertyMap,
    ) -> Result<Session<K::Transport>, RoomwireError> {
        let mut session = self.open()?;
        session.create(option.to_spec(), player_props)?;
        tracing::debug!(user_id = %self.config.user_id, max_players = option.max_players, "create requested");
        Ok(session)
    }

    /// Joins a room by id or number, or at random within a search group.
    /// With a query, the authority only admits the client to a room whose
    /// public properties match it.
    pub fn join(
        &self,
        room: RoomSelector,
        query: Option<&Query>,
        player_props: &PropertyMap,
    ) -> Result<Session<K::Transport>, RoomwireError> {
        let mut session = self.open()?;
        tracing::debug!(user_id = %self.config.user_id, %room, "join requested");
        session.join(room, query, player_props)?;
        Ok(session)
    }

    /// Joins any joinable room in `search_group` that matches `query`.
    pub fn join_random(
        &self,
        search_group: u32,
        query: &Query,
        player_props: &PropertyMap,
    ) -> Result<Session<K::Transport>, RoomwireError> {
        self.join(RoomSelector::Random { search_group }, Some(query), player_props)
    }

    /// Watches a room without joining its roster.
    pub fn watch(
        &self,
        room: RoomSelector,
        query: Option<&Query>,
    ) -> Result<Session<K::Transport>, RoomwireError> {
        let mut session = self.open()?;
        tracing::debug!(user_id = %self.config.user_id, %room, "watch requested");
        session.watch(room, query)?;
        Ok(session)
    }

    pub async fn search(&self, request: SearchRequest) -> Result<Vec<RoomSummary>, RoomwireError> {
        Ok(self.searcher.search(request).await?)
    }
}

impl<K, S> fmt::Debug for Client<K, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client").field("config", &self.config).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roomwire_room::RoomDirectory;
    use roomwire_session::{APP_ID_HEADER, AUTHORIZATION_HEADER, USER_ID_HEADER};
    use roomwire_transport::ChannelConnector;

    fn config() -> ClientConfig {
        ClientConfig::new("mem://rooms", "app-1", "alice", "secret")
    }

    #[test]
    fn test_connect_request_carries_verifiable_credential() {
        let (connector, _acceptor) = ChannelConnector::pair();
        let client = Client::new(config(), connector, RoomDirectory::new());

        let request = client.connect_request();

        assert_eq!(request.url, "mem://rooms");
        assert_eq!(request.header_value(APP_ID_HEADER), Some("app-1"));
        assert_eq!(request.header_value(USER_ID_HEADER), Some("alice"));
        let bearer = request.header_value(AUTHORIZATION_HEADER).unwrap();
        let credential = Credential::from_bearer("alice", bearer).unwrap();
        assert!(credential.verify("secret"));
        assert!(!credential.verify("other"));
    }

    #[test]
    fn test_debug_hides_app_key() {
        let text = format!("{:?}", config());
        assert!(text.contains("alice"));
        assert!(!text.contains("secret"));
    }

    #[test]
    fn test_join_sends_request_and_moves_to_joining() {
        let (connector, mut acceptor) = ChannelConnector::pair();
        let client = Client::new(config(), connector, RoomDirectory::new());

        let session = client
            .join(RoomSelector::Number(42), None, &PropertyMap::new())
            .unwrap();

        assert_eq!(session.state(), roomwire_session::SessionState::Joining);
        let mut peer = acceptor.try_accept().unwrap();
        assert_eq!(peer.drain().len(), 1);
    }
}
