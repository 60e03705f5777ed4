use crate::backend::cache::QueryFamily;
use crate::backend::connection::Connection;
use crate::backend::transport::Transport;
use crate::backend::types::{HolidayRequest, PermissionRequest, UserProfile};
use crate::backend::CachedBackend;
use crate::cache::QueryClient;
use crate::commands;
use crate::config::Config;
use crate::db::{DashboardMode, SettingsStore};
use crate::event::{Event, EventHandler, Notice};
use crate::query::Query;
use crate::ui;
use crate::ui::components::{CommandEvent, CommandInput, KeyResult};
use crate::ui::view::{ShortcutInfo, View, ViewAction, ViewContext};
use crate::ui::views::{
  ApprovalsView, AttendanceView, HistoryView, HolidaysView, InvitesView, OnboardingView,
  PermissionsView, ProfileView, TeamView,
};
use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{
  disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;
use std::io::stdout;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

/// How long a notice stays in the footer
const NOTICE_TTL: Duration = Duration::from_secs(5);

const NOT_ALLOWED: &str = "You are not allowed to do that";

/// Connection lifecycle as seen by the UI
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
  Connecting,
  /// Connection attempt failed
  Offline(String),
  LoggedOut,
  Ready,
}

/// Which flow the root of the view stack belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Route {
  Onboarding,
  ProfileSetup,
  Dashboard,
}

/// Startup options that do not come from the config file
#[derive(Debug, Clone, Default)]
pub struct Options {
  /// Invite code to onboard with when no profile exists
  pub invite: Option<String>,
  pub export_dir: Option<PathBuf>,
}

/// Main application state
pub struct App {
  /// Navigation stack - root is always at index 0
  view_stack: Vec<Box<dyn View>>,
  route: Option<Route>,
  phase: Phase,

  command_input: CommandInput,
  notice: Option<(Notice, Instant)>,

  config: Config,
  backend: CachedBackend,
  transport: Arc<dyn Transport>,
  settings: SettingsStore,
  /// Stored dashboard mode; only honored for admins
  mode: DashboardMode,
  invite: Option<String>,
  export_dir: PathBuf,

  /// Caller's profile and admin flag, live while connected
  profile: Option<Query<Option<UserProfile>>>,
  admin: Option<Query<bool>>,

  /// Event sender for async tasks
  event_tx: mpsc::UnboundedSender<Event>,

  /// Whether to quit
  should_quit: bool,
}

impl App {
  pub fn new(
    config: Config,
    transport: Arc<dyn Transport>,
    settings: SettingsStore,
    options: Options,
  ) -> Self {
    let backend = CachedBackend::new(Connection::new(), QueryClient::new(config.stale_time()));
    let (tx, _rx) = mpsc::unbounded_channel();

    let mode = settings.view_mode().unwrap_or_else(|e| {
      tracing::warn!(error = %e, "failed to read dashboard mode");
      DashboardMode::default()
    });
    let export_dir = options.export_dir.unwrap_or_else(|| config.export_dir());

    Self {
      view_stack: Vec::new(),
      route: None,
      phase: Phase::Connecting,
      command_input: CommandInput::new(),
      notice: None,
      config,
      backend,
      transport,
      settings,
      mode,
      invite: options.invite.filter(|code| !code.trim().is_empty()),
      export_dir,
      profile: None,
      admin: None,
      event_tx: tx,
      should_quit: false,
    }
  }

  pub async fn run(&mut self) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    // Create event handler
    let mut events = EventHandler::new(Duration::from_millis(250));
    self.event_tx = events.sender();

    self.connect();

    // Main loop
    let result = self.main_loop(&mut terminal, &mut events).await;

    // Cleanup terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
  }

  async fn main_loop(
    &mut self,
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    events: &mut EventHandler,
  ) -> Result<()> {
    while !self.should_quit {
      terminal.draw(|frame| ui::draw(frame, self))?;

      if let Some(event) = events.next().await {
        self.handle_event(event);
      }
    }
    Ok(())
  }

  fn connect(&mut self) {
    self.phase = Phase::Connecting;
    let backend = self.backend.clone();
    let transport = self.transport.clone();
    let tx = self.event_tx.clone();

    tracing::info!(url = %self.config.backend.url, "connecting");
    tokio::spawn(async move {
      let result = backend.connect(transport).await.map_err(|e| e.to_string());
      let _ = tx.send(Event::Connected(result));
    });
  }

  fn handle_event(&mut self, event: Event) {
    match event {
      Event::Key(key) => self.handle_key(key),
      Event::Tick => self.tick(),
      Event::Connected(Ok(())) => {
        tracing::info!("connected");
        self.phase = Phase::Ready;
        self.start_session();
      }
      Event::Connected(Err(e)) => {
        tracing::warn!(error = %e, "connection failed");
        self.phase = Phase::Offline(e);
      }
      Event::Notice(notice) => self.notify(notice),
    }
  }

  /// Context handed to every new view
  fn context(&self) -> ViewContext {
    let mut ctx = ViewContext::new(
      self.backend.clone(),
      self.event_tx.clone(),
      self.export_dir.clone(),
      self.config.backend.url.clone(),
    );
    ctx.admin = self.is_admin();
    ctx
  }

  fn start_session(&mut self) {
    let ctx = self.context();
    self.profile = Some(ctx.query(&[QueryFamily::CurrentUserProfile], |backend| async move {
      backend.current_user_profile().await
    }));
    self.admin = Some(ctx.query(&[QueryFamily::IsAdmin], |backend| async move {
      backend.is_admin().await
    }));
    self.route = None;
    self.view_stack.clear();
  }

  fn tick(&mut self) {
    if let Some((_, shown)) = &self.notice {
      if shown.elapsed() >= NOTICE_TTL {
        self.notice = None;
      }
    }

    if self.phase != Phase::Ready {
      return;
    }

    if let Some(query) = self.profile.as_mut() {
      query.poll();
    }
    if let Some(query) = self.admin.as_mut() {
      if query.poll() {
        self.command_input.set_admin(self.is_admin());
      }
    }
    self.update_route();

    for view in self.view_stack.iter_mut() {
      view.tick();
    }
  }

  /// Pick the flow for the caller once profile and role are known
  fn update_route(&mut self) {
    let (Some(profile), Some(admin)) = (&self.profile, &self.admin) else {
      return;
    };
    if let Some(error) = profile.error() {
      tracing::warn!(%error, "failed to load profile");
      self.phase = Phase::Offline(error.to_string());
      return;
    }

    let target = match profile.data() {
      Some(Some(_)) if admin.data().is_some() || admin.is_error() => Route::Dashboard,
      Some(Some(_)) => return,
      Some(None) if self.invite.is_some() => Route::Onboarding,
      Some(None) => Route::ProfileSetup,
      None => return,
    };

    if self.route != Some(target) {
      tracing::debug!(?target, "routing");
      self.route = Some(target);
      let root = self.root_view(target);
      self.set_root(root);
    }
  }

  fn root_view(&self, route: Route) -> Box<dyn View> {
    let ctx = self.context();
    match route {
      Route::Onboarding => Box::new(OnboardingView::new(
        ctx,
        self.invite.clone().unwrap_or_default(),
      )),
      Route::ProfileSetup => Box::new(ProfileView::setup(ctx)),
      Route::Dashboard => self.dashboard_root(),
    }
  }

  fn dashboard_root(&self) -> Box<dyn View> {
    let ctx = self.context();
    match self.mode() {
      DashboardMode::Admin => Box::new(TeamView::new(ctx)),
      DashboardMode::Personal => Box::new(AttendanceView::new(ctx)),
    }
  }

  fn set_root(&mut self, view: Box<dyn View>) {
    self.view_stack.clear();
    self.view_stack.push(view);
  }

  fn handle_key(&mut self, key: KeyEvent) {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
      self.should_quit = true;
      return;
    }

    if self.command_input.is_active() {
      if let KeyResult::Event(CommandEvent::Submitted(name)) = self.command_input.handle_key(key) {
        self.execute_command(&name);
      }
      return;
    }

    if self.phase != Phase::Ready {
      match key.code {
        KeyCode::Char('q') => self.should_quit = true,
        KeyCode::Enter if matches!(self.phase, Phase::Offline(_) | Phase::LoggedOut) => {
          self.connect()
        }
        _ => {}
      }
      return;
    }

    let captured = self.current_view().is_some_and(|v| v.captures_input());
    if !captured && self.route == Some(Route::Dashboard) {
      if let KeyResult::Handled = self.command_input.handle_key(key) {
        return;
      }
    }

    let Some(view) = self.view_stack.last_mut() else {
      if key.code == KeyCode::Char('q') {
        self.should_quit = true;
      }
      return;
    };

    match view.handle_key(key) {
      ViewAction::None => {}
      ViewAction::Push(view) => self.view_stack.push(view),
      ViewAction::Pop => {
        if self.view_stack.len() > 1 {
          self.view_stack.pop();
        } else if key.code == KeyCode::Char('q') {
          self.should_quit = true;
        }
      }
    }
  }

  fn execute_command(&mut self, name: &str) {
    if name.is_empty() {
      return;
    }
    let Some(command) = commands::find(name) else {
      self.notify(Notice::error(format!("Unknown command: {}", name)));
      return;
    };
    if command.admin && !self.is_admin() {
      tracing::warn!(command = command.name, "admin command refused");
      self.notify(Notice::error(NOT_ALLOWED));
      return;
    }

    let ctx = self.context();
    match command.name {
      "attendance" => self.set_root(Box::new(AttendanceView::new(ctx))),
      "holidays" => self.set_root(Box::new(HolidaysView::new(ctx))),
      "permissions" => self.set_root(Box::new(PermissionsView::new(ctx))),
      "history" => self.set_root(Box::new(HistoryView::new(ctx))),
      "profile" => self.view_stack.push(Box::new(ProfileView::edit(ctx))),
      "team" => self.set_root(Box::new(TeamView::new(ctx))),
      "holiday-approvals" => self.set_root(Box::new(ApprovalsView::<HolidayRequest>::new(ctx))),
      "permission-approvals" => {
        self.set_root(Box::new(ApprovalsView::<PermissionRequest>::new(ctx)))
      }
      "invites" => self.set_root(Box::new(InvitesView::new(ctx))),
      "mode" => self.toggle_mode(),
      "logout" => self.logout(),
      "quit" => self.should_quit = true,
      _ => {}
    }
  }

  fn toggle_mode(&mut self) {
    if !self.is_admin() {
      self.notify(Notice::error(NOT_ALLOWED));
      return;
    }

    self.mode = self.mode.toggled();
    if let Err(e) = self.settings.set_view_mode(self.mode) {
      tracing::warn!(error = %e, "failed to save dashboard mode");
    }
    let root = self.dashboard_root();
    self.set_root(root);
    self.notify(Notice::success(format!("Switched to {} dashboard", self.mode.as_str())));
  }

  fn logout(&mut self) {
    tracing::info!("logging out");
    self.backend.logout();
    self.profile = None;
    self.admin = None;
    self.route = None;
    self.view_stack.clear();
    self.command_input.set_admin(false);
    self.phase = Phase::LoggedOut;
  }

  fn notify(&mut self, notice: Notice) {
    self.notice = Some((notice, Instant::now()));
  }

  fn is_admin(&self) -> bool {
    self
      .admin
      .as_ref()
      .and_then(|q| q.data())
      .copied()
      .unwrap_or(false)
  }

  fn current_view(&self) -> Option<&dyn View> {
    self.view_stack.last().map(|v| v.as_ref())
  }

  // Accessors for UI rendering
  pub fn current_view_mut(&mut self) -> Option<&mut Box<dyn View>> {
    self.view_stack.last_mut()
  }

  pub fn phase(&self) -> &Phase {
    &self.phase
  }

  /// Effective dashboard mode: admin mode needs the admin role
  pub fn mode(&self) -> DashboardMode {
    if self.is_admin() {
      self.mode
    } else {
      DashboardMode::Personal
    }
  }

  pub fn title(&self) -> String {
    self.config.display_title()
  }

  pub fn user_name(&self) -> Option<String> {
    match self.profile.as_ref()?.data()? {
      Some(profile) if !profile.name.is_empty() => Some(profile.name.clone()),
      _ => None,
    }
  }

  pub fn connection_label(&self) -> &'static str {
    self.backend.connection().state_label()
  }

  pub fn command_input(&self) -> &CommandInput {
    &self.command_input
  }

  pub fn notice(&self) -> Option<&Notice> {
    self.notice.as_ref().map(|(notice, _)| notice)
  }

  pub fn shortcuts(&self) -> Vec<ShortcutInfo> {
    match (&self.phase, self.current_view()) {
      (Phase::Ready, Some(view)) => view.shortcuts(),
      (Phase::Offline(_) | Phase::LoggedOut, _) => vec![
        ShortcutInfo::new("Enter", "connect").with_priority(10),
        ShortcutInfo::new("q", "quit").with_priority(90),
      ],
      _ => vec![ShortcutInfo::new("q", "quit").with_priority(90)],
    }
  }

  pub fn breadcrumb(&self) -> Vec<String> {
    self
      .view_stack
      .iter()
      .map(|v| v.breadcrumb_label())
      .collect()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::backend::fake::FakeBackend;
  use crate::db::Database;
  use crossterm::event::KeyEventKind;

  fn config() -> Config {
    serde_yaml::from_str("backend:\n  url: https://hr.example.com\n").unwrap()
  }

  fn profile() -> UserProfile {
    UserProfile {
      name: "Ada".to_string(),
      position: "Engineer".to_string(),
      is_employee: true,
      holiday_balance: 20,
    }
  }

  fn app(fake: FakeBackend, invite: Option<&str>) -> (App, mpsc::UnboundedReceiver<Event>) {
    let settings = SettingsStore::new(Database::open_in_memory().unwrap());
    let options = Options {
      invite: invite.map(String::from),
      export_dir: Some(PathBuf::from(".")),
    };
    let mut app = App::new(config(), Arc::new(fake), settings, options);
    let (tx, rx) = mpsc::unbounded_channel();
    app.event_tx = tx;
    (app, rx)
  }

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new_with_kind(code, KeyModifiers::NONE, KeyEventKind::Press)
  }

  fn type_command(app: &mut App, text: &str) {
    app.handle_key(key(KeyCode::Char(':')));
    for c in text.chars() {
      app.handle_key(key(KeyCode::Char(c)));
    }
    app.handle_key(key(KeyCode::Enter));
  }

  /// Connect, then tick until a root view is routed
  async fn settle(app: &mut App, rx: &mut mpsc::UnboundedReceiver<Event>) {
    app.connect();
    let event = tokio::time::timeout(Duration::from_secs(1), rx.recv())
      .await
      .unwrap()
      .unwrap();
    app.handle_event(event);
    for _ in 0..50 {
      app.tick();
      if app.route.is_some() {
        return;
      }
      tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("no route after connecting");
  }

  #[tokio::test]
  async fn test_existing_profile_routes_to_dashboard() {
    let (mut app, mut rx) = app(FakeBackend::new().with_profile(profile()), None);
    settle(&mut app, &mut rx).await;

    assert_eq!(app.phase(), &Phase::Ready);
    assert_eq!(app.route, Some(Route::Dashboard));
    assert_eq!(app.breadcrumb(), vec!["Attendance".to_string()]);
    assert_eq!(app.user_name(), Some("Ada".to_string()));
  }

  #[tokio::test]
  async fn test_invite_without_profile_routes_to_onboarding() {
    let fake = FakeBackend::new();
    fake.add_invite("WELCOME1");
    let (mut app, mut rx) = app(fake, Some("WELCOME1"));
    settle(&mut app, &mut rx).await;

    assert_eq!(app.route, Some(Route::Onboarding));
    assert_eq!(app.breadcrumb(), vec!["Onboarding".to_string()]);
  }

  #[tokio::test]
  async fn test_no_profile_routes_to_setup() {
    let (mut app, mut rx) = app(FakeBackend::new(), None);
    settle(&mut app, &mut rx).await;

    assert_eq!(app.route, Some(Route::ProfileSetup));
  }

  #[tokio::test]
  async fn test_admin_command_refused_for_regular_user() {
    let fake = FakeBackend::new().with_profile(profile()).as_regular_user();
    let (mut app, mut rx) = app(fake, None);
    settle(&mut app, &mut rx).await;

    type_command(&mut app, "invites");
    assert_eq!(app.notice(), Some(&Notice::error(NOT_ALLOWED)));
    assert_eq!(app.breadcrumb(), vec!["Attendance".to_string()]);
  }

  #[tokio::test]
  async fn test_mode_toggle_is_persisted_for_admins() {
    let (mut app, mut rx) = app(FakeBackend::new().with_profile(profile()), None);
    settle(&mut app, &mut rx).await;

    type_command(&mut app, "mode");
    assert_eq!(app.mode(), DashboardMode::Admin);
    assert_eq!(app.breadcrumb(), vec!["Team".to_string()]);
    assert_eq!(app.settings.view_mode().unwrap(), DashboardMode::Admin);
  }

  #[tokio::test]
  async fn test_logout_clears_session() {
    let (mut app, mut rx) = app(FakeBackend::new().with_profile(profile()), None);
    settle(&mut app, &mut rx).await;

    type_command(&mut app, "logout");
    assert_eq!(app.phase(), &Phase::LoggedOut);
    assert!(app.breadcrumb().is_empty());
    assert_eq!(app.connection_label(), "disconnected");
  }

  #[tokio::test]
  async fn test_q_on_root_quits_and_pops_otherwise() {
    let (mut app, mut rx) = app(FakeBackend::new().with_profile(profile()), None);
    settle(&mut app, &mut rx).await;

    type_command(&mut app, "profile");
    assert_eq!(app.breadcrumb().len(), 2);

    app.handle_key(key(KeyCode::Char('q')));
    assert_eq!(app.breadcrumb().len(), 1);
    assert!(!app.should_quit);

    app.handle_key(key(KeyCode::Char('q')));
    assert!(app.should_quit);
  }
}
