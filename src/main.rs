mod backend;
mod client;
mod config;
mod db;
mod error;
mod models;
mod notifications;
mod progression;
mod quests;
mod runtime;
mod session;
mod store;

use iced::mouse;
use iced::widget::canvas::{self, Canvas, Frame, Geometry, Path};
use iced::widget::mouse_area;
use iced::widget::{button, column, container, row, rule, scrollable, space, text, text_input};
use iced::{window, Center, Color, Element, Fill, Padding, Subscription, Task, Theme};
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

use client::{AuthState, Client, Effect, Event, NameAvailability};
use config::Config;
use models::Quest;
use progression::{HELP_TABLE_LEVELS, SubjectView};
use store::LocalStore;

fn main() -> iced::Result {
    let (config, config_error) = match config::load_config() {
        Ok(c) => (c, None),
        Err(e) => (Config::default(), Some(e)),
    };
    init_logging(&config.logging.filter);
    if let Some(e) = config_error {
        warn!("using default config: {}", e);
    }

    let window_settings = window::Settings {
        size: iced::Size::new(420.0, 680.0),
        decorations: false,
        ..Default::default()
    };

    iced::application(move || App::new(config.clone()), update, view)
        .title("Quizzy")
        .theme(Theme::CatppuccinMocha)
        .subscription(subscription)
        .window(window_settings)
        .centered()
        .run()
}

fn init_logging(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum View {
    Quests,
    Help,
}

#[derive(Debug, Clone)]
enum Message {
    Backend(Option<Event>),
    Login,
    Logout,
    NameEdited(String),
    CreateProfile,
    StartNameEdit,
    CancelNameEdit,
    SaveName,
    DifficultyDown,
    DifficultyUp,
    GenerateQuest,
    AnswerEdited(String),
    SubmitAnswer,
    DismissError,
    DismissLevelUp,
    SwitchView(View),
    Minimize,
    Close,
    WindowReady(window::Id),
    DragStart,
}

struct App {
    client: Client,
    store: Option<LocalStore>,
    store_error: Option<String>,
    current_view: View,
    window_id: Option<window::Id>,
}

impl App {
    fn new(config: Config) -> (Self, Task<Message>) {
        let path = db::db_path(config.data_dir.as_deref());
        let (store, store_error) = match LocalStore::open(&path, config.progression) {
            Ok(s) => (Some(s), None),
            Err(e) => {
                error!("could not open store at {}: {}", path.display(), e);
                (None, Some(e.to_string()))
            }
        };

        let mut app = App {
            client: Client::new(
                config.progression,
                config.quests.default_difficulty,
                config.quests.max_difficulty,
            ),
            store,
            store_error,
            current_view: View::Quests,
            window_id: None,
        };
        let effects = app.client.start();
        let task = run_effects(&app, effects);
        (app, task)
    }
}

/// hand effects to the runtime, results come back as `Message::Backend`
fn run_effects(app: &App, effects: Vec<Effect>) -> Task<Message> {
    let Some(store) = &app.store else {
        return Task::none();
    };
    Task::batch(effects.into_iter().map(|effect| {
        let store = store.clone();
        Task::perform(
            async move { runtime::perform(&store, &store, effect).await },
            Message::Backend,
        )
    }))
}

fn update(app: &mut App, message: Message) -> Task<Message> {
    let effects = match message {
        Message::Backend(Some(event)) => app.client.handle(event),
        Message::Backend(None) => Vec::new(),
        Message::Login => app.client.login(),
        Message::Logout => {
            app.current_view = View::Quests;
            app.client.logout()
        }
        Message::NameEdited(name) => app.client.edit_name(name),
        Message::CreateProfile => app.client.create_profile(),
        Message::StartNameEdit => {
            app.client.start_name_edit();
            Vec::new()
        }
        Message::CancelNameEdit => {
            app.client.cancel_name_edit();
            Vec::new()
        }
        Message::SaveName => app.client.change_display_name(),
        Message::DifficultyDown => {
            let d = app.client.difficulty().saturating_sub(1);
            app.client.set_difficulty(d);
            Vec::new()
        }
        Message::DifficultyUp => {
            let d = app.client.difficulty() + 1;
            app.client.set_difficulty(d);
            Vec::new()
        }
        Message::GenerateQuest => app.client.generate_quest(),
        Message::AnswerEdited(answer) => {
            app.client.edit_answer(answer);
            Vec::new()
        }
        Message::SubmitAnswer => app.client.submit_answer(),
        Message::DismissError => {
            app.client.dismiss_error();
            Vec::new()
        }
        Message::DismissLevelUp => {
            app.client.dismiss_level_up();
            Vec::new()
        }
        Message::SwitchView(v) => {
            app.current_view = v;
            Vec::new()
        }
        Message::WindowReady(id) => {
            app.window_id = Some(id);
            Vec::new()
        }
        Message::DragStart => {
            return if let Some(id) = app.window_id {
                window::drag(id)
            } else {
                Task::none()
            };
        }
        Message::Minimize => {
            return if let Some(id) = app.window_id {
                window::minimize(id, true)
            } else {
                Task::none()
            };
        }
        Message::Close => {
            return if let Some(id) = app.window_id {
                window::close(id)
            } else {
                Task::none()
            };
        }
    };
    run_effects(app, effects)
}

fn subscription(app: &App) -> Subscription<Message> {
    if app.window_id.is_none() {
        window::open_events().map(Message::WindowReady)
    } else {
        Subscription::none()
    }
}

fn view_titlebar(_app: &App) -> Element<'_, Message> {
    let drag_area = mouse_area(
        space::horizontal()
            .width(iced::Length::Fill)
            .height(iced::Length::Fill),
    )
    .on_press(Message::DragStart);

    let minimize = mouse_area(text("─").size(20)).on_press(Message::Minimize);

    let close = mouse_area(text("✕").size(18)).on_press(Message::Close);

    row![
        drag_area,
        minimize,
        space::horizontal().width(iced::Length::Fixed(12.0)),
        close,
    ]
    .align_y(Center)
    .padding(Padding::from([0u16, 8]))
    .height(40)
    .into()
}

fn view(app: &App) -> Element<'_, Message> {
    let titlebar = view_titlebar(app);

    let content: Element<Message> = if let Some(e) = &app.store_error {
        view_message("Could not open your data", e)
    } else {
        match app.client.auth() {
            AuthState::Checking => view_message("Quizzy", "Loading..."),
            AuthState::SignedOut | AuthState::SigningIn => view_login(app),
            AuthState::SignedIn(_) if app.client.profile().is_none() => {
                if app.client.profile_loading() {
                    view_message("Quizzy", "Loading profile...")
                } else {
                    view_create_profile(app)
                }
            }
            AuthState::SignedIn(_) => match app.current_view {
                View::Quests => view_main(app),
                View::Help => view_help(app),
            },
        }
    };

    let mut layout = column![titlebar].spacing(0).width(Fill).height(Fill);
    if let Some(e) = app.client.error() {
        layout = layout.push(view_error_banner(&e.to_string()));
    }
    layout = layout.push(scrollable(content).height(Fill));
    if app.client.is_signed_in() && app.client.profile().is_some() {
        layout = layout
            .push(space::vertical().height(8))
            .push(view_nav(app))
            .push(space::vertical().height(12));
    }

    let main_view = container(layout.padding(Padding::from([0u16, 24])))
        .width(Fill)
        .height(Fill);

    if let Some(level_up) = app.client.level_up() {
        let modal = column![
            text("🎉 Level Up! 🎉").size(28),
            space::vertical().height(20),
            text(format!("Level {}", level_up.level)).size(24),
            space::vertical().height(8),
            text(level_up.subject.clone()).size(18),
            space::vertical().height(24),
            button(text("Continue").size(16))
                .on_press(Message::DismissLevelUp)
                .padding([12, 24])
                .style(button::primary),
        ]
        .align_x(Center)
        .spacing(0)
        .padding(32);

        let modal_container = container(modal)
            .width(iced::Length::Fill)
            .center_x(iced::Length::Fill)
            .center_y(iced::Length::Fill);

        column![main_view, modal_container].into()
    } else {
        main_view.into()
    }
}

fn view_message<'a>(title: &'a str, body: &'a str) -> Element<'a, Message> {
    column![
        space::vertical().height(40),
        text(title).size(26),
        space::vertical().height(12),
        text(body).size(14),
    ]
    .align_x(Center)
    .width(Fill)
    .into()
}

fn view_error_banner(message: &str) -> Element<'static, Message> {
    container(
        row![
            text(message.to_string())
                .size(13)
                .color(Color::from_rgb(0.95, 0.45, 0.45))
                .width(Fill),
            mouse_area(text("✕").size(14)).on_press(Message::DismissError),
        ]
        .spacing(8)
        .align_y(Center),
    )
    .padding(Padding::from([6u16, 0]))
    .width(Fill)
    .into()
}

fn view_login(app: &App) -> Element<'_, Message> {
    let signing_in = app.client.auth() == &AuthState::SigningIn;
    let label = if signing_in { "Signing in..." } else { "Login" };

    column![
        space::vertical().height(40),
        text("Welcome to Quizzy!").size(26),
        space::vertical().height(8),
        text("Answer quests, earn XP and credits, level up.").size(14),
        space::vertical().height(24),
        button(text(label).size(16).align_x(Center))
            .on_press_maybe((!signing_in).then_some(Message::Login))
            .padding([10, 28])
            .style(button::primary),
    ]
    .align_x(Center)
    .width(Fill)
    .into()
}

fn view_name_input<'a>(app: &'a App, placeholder: &'a str, submit: Message) -> Element<'a, Message> {
    let availability = match app.client.name_availability() {
        NameAvailability::Unknown => text(""),
        NameAvailability::Checking => text("Checking...").size(12),
        NameAvailability::Available => text("✓ Name is available")
            .size(12)
            .color(Color::from_rgb(0.4, 0.9, 0.4)),
        NameAvailability::Taken => text("✗ Name is already taken")
            .size(12)
            .color(Color::from_rgb(0.95, 0.45, 0.45)),
    };

    column![
        text_input(placeholder, app.client.name_draft())
            .on_input(Message::NameEdited)
            .on_submit(submit)
            .padding(8)
            .size(14),
        availability,
    ]
    .spacing(4)
    .width(Fill)
    .into()
}

fn view_create_profile(app: &App) -> Element<'_, Message> {
    column![
        space::vertical().height(24),
        text("Create Profile").size(24),
        space::vertical().height(16),
        view_name_input(app, "Enter your display name", Message::CreateProfile),
        space::vertical().height(12),
        row![
            button(text("Create New Profile").size(14).align_x(Center))
                .on_press(Message::CreateProfile)
                .padding([8, 20])
                .style(button::primary),
            space::horizontal(),
            button(text("Logout").size(14))
                .on_press(Message::Logout)
                .padding([8, 20])
                .style(button::secondary),
        ]
        .width(Fill),
    ]
    .width(Fill)
    .into()
}

fn view_main(app: &App) -> Element<'_, Message> {
    let header = row![
        text("Quizzy").size(22),
        space::horizontal(),
        button(text("Logout").size(13))
            .on_press(Message::Logout)
            .padding([6, 14])
            .style(button::secondary),
    ]
    .align_y(Center)
    .width(Fill);

    let mut subjects = column![].spacing(12).width(Fill);
    for (name, view) in app.client.subject_views() {
        subjects = subjects.push(view_subject(name, view));
    }

    column![
        header,
        space::vertical().height(12),
        view_player(app),
        space::vertical().height(12),
        subjects,
        space::vertical().height(16),
        rule::horizontal(1),
        space::vertical().height(12),
        view_quest(app),
    ]
    .spacing(0)
    .width(Fill)
    .into()
}

fn view_player(app: &App) -> Element<'_, Message> {
    if app.client.is_editing_name() {
        column![
            view_name_input(app, "Enter new display name", Message::SaveName),
            row![
                button(text("Save").size(13))
                    .on_press(Message::SaveName)
                    .padding([6, 14])
                    .style(button::primary),
                button(text("Cancel").size(13))
                    .on_press(Message::CancelNameEdit)
                    .padding([6, 14])
                    .style(button::secondary),
            ]
            .spacing(8),
        ]
        .spacing(8)
        .into()
    } else {
        let name = app
            .client
            .profile()
            .map(|p| p.display_name.as_str())
            .unwrap_or("Unknown");
        row![
            text(format!("Player: {}", name)).size(16),
            space::horizontal(),
            button(text("✏️ Change Name").size(12))
                .on_press(Message::StartNameEdit)
                .padding([4, 10])
                .style(button::secondary),
        ]
        .align_y(Center)
        .width(Fill)
        .into()
    }
}

fn view_subject(name: String, view: SubjectView) -> Element<'static, Message> {
    column![
        row![
            text(name).size(16),
            space::horizontal(),
            text(format!("🪙 {} Credits", view.credits)).size(13),
        ]
        .width(Fill),
        text(format!("Level {}", view.level)).size(14),
        text(format!("XP: {} / {}", view.current_level_xp, view.level_span)).size(13),
        view_progress_bar(view.progress, 10.0),
        text(format!("Quests Completed: {}", view.quests_completed)).size(12),
    ]
    .spacing(4)
    .width(Fill)
    .into()
}

fn view_quest(app: &App) -> Element<'_, Message> {
    let session = app.client.session();
    let difficulty = app.client.difficulty();
    let generate_label = if session.is_completed() { "Next Quest" } else { "Generate New Quest" };

    let controls = row![
        text("Difficulty").size(14),
        button(text("−").size(14))
            .on_press_maybe((difficulty > 1).then_some(Message::DifficultyDown))
            .padding([2, 10]),
        text(difficulty.to_string()).size(14),
        button(text("+").size(14))
            .on_press_maybe((difficulty < app.client.max_difficulty()).then_some(Message::DifficultyUp))
            .padding([2, 10]),
        space::horizontal(),
        button(text(generate_label).size(14))
            .on_press_maybe((!session.is_generating()).then_some(Message::GenerateQuest))
            .padding([8, 16])
            .style(button::primary),
    ]
    .spacing(8)
    .align_y(Center)
    .width(Fill);

    let mut panel = column![text("Math Quest").size(20), controls].spacing(10).width(Fill);

    if session.is_generating() {
        panel = panel.push(text("Generating quest...").size(13));
    }

    if let Some(quest) = session.quest() {
        let submit_label = if session.is_submitting() { "Checking..." } else { "Submit" };
        let input_enabled = session.input_enabled();

        let mut answer = text_input("Enter your answer", session.answer_text())
            .padding(8)
            .size(14);
        if input_enabled {
            answer = answer
                .on_input(Message::AnswerEdited)
                .on_submit(Message::SubmitAnswer);
        }

        panel = panel
            .push(text(quest.content.question.clone()).size(18))
            .push(reward_row(app, quest))
            .push(
                row![
                    answer,
                    button(text(submit_label).size(14))
                        .on_press_maybe(input_enabled.then_some(Message::SubmitAnswer))
                        .padding([8, 16])
                        .style(button::primary),
                ]
                .spacing(8)
                .align_y(Center),
            );

        if session.attempt_count() > 0 {
            panel = panel.push(text(format!("Attempts: {}", session.attempt_count())).size(12));
        }
    }

    if !session.feedback().is_empty() {
        let color = if session.is_answered_correctly() {
            Color::from_rgb(0.4, 0.9, 0.4)
        } else {
            Color::from_rgb(0.95, 0.65, 0.35)
        };
        panel = panel.push(text(session.feedback().to_string()).size(14).color(color));
    }

    if let Some(e) = session.error() {
        panel = panel.push(
            text(e.to_string())
                .size(13)
                .color(Color::from_rgb(0.95, 0.45, 0.45)),
        );
    }

    panel.into()
}

/// rewards as granted by the quest, local expectation shown when it differs
fn reward_row<'a>(app: &App, quest: &Quest) -> Element<'a, Message> {
    let mut rewards = row![
        text(format!("⭐ {} XP", quest.xp_reward)).size(13),
        text(format!("🪙 {} Credits", quest.credit_reward)).size(13),
    ]
    .spacing(16);
    if let Some((xp, credits)) = app.client.reward_mismatch() {
        rewards = rewards.push(
            text(format!("(expected {} XP, {} credits)", xp, credits))
                .size(12)
                .color(Color::from_rgb(0.95, 0.65, 0.35)),
        );
    }
    rewards.into()
}

fn view_help(app: &App) -> Element<'_, Message> {
    let table = app.client.progression().level_table(HELP_TABLE_LEVELS);

    let cell = |s: String| text(s).size(12).width(Fill);
    let mut rows = column![row![
        cell("Level".into()),
        cell("Total XP".into()),
        cell("XP for Level".into()),
        cell("Quest XP".into()),
        cell("Quests".into()),
    ]]
    .spacing(4)
    .width(Fill);

    for r in table {
        rows = rows.push(row![
            cell(r.level.to_string()),
            cell(r.total_xp.to_string()),
            cell(r.level_xp.to_string()),
            cell(r.quest_xp.to_string()),
            cell(r.quests_needed.to_string()),
        ]);
    }

    column![
        text("Quizzy Help").size(22),
        space::vertical().height(12),
        text("How to Play").size(16),
        text("Generate a quest, pick a difficulty, and answer to earn XP and credits. Wrong answers cost nothing but count as attempts.").size(13),
        space::vertical().height(12),
        text("XP and Leveling").size(16),
        text("Each level needs more XP than the last, but harder quests pay more.").size(13),
        space::vertical().height(8),
        rule::horizontal(1),
        space::vertical().height(8),
        rows,
    ]
    .spacing(4)
    .width(Fill)
    .into()
}

fn view_nav(app: &App) -> Element<'_, Message> {
    let quests_style = if app.current_view == View::Quests {
        button::primary
    } else {
        button::secondary
    };
    let help_style = if app.current_view == View::Help {
        button::primary
    } else {
        button::secondary
    };

    row![
        button(text("⭐  Quests").size(14).align_x(Center))
            .on_press(Message::SwitchView(View::Quests))
            .padding([8, 20])
            .width(Fill)
            .style(quests_style),
        button(text("❓  Help").size(14).align_x(Center))
            .on_press(Message::SwitchView(View::Help))
            .padding([8, 20])
            .width(Fill)
            .style(help_style),
    ]
    .spacing(8)
    .width(Fill)
    .into()
}

fn view_progress_bar(progress: f32, height: f32) -> Element<'static, Message> {
    Canvas::new(ProgressBarWidget {
        progress: progress.clamp(0.0, 1.0),
    })
    .width(Fill)
    .height(height)
    .into()
}

// -- canvas widgets --

struct ProgressBarWidget {
    progress: f32,
}

impl canvas::Program<Message> for ProgressBarWidget {
    type State = ();

    fn draw(
        &self,
        _state: &Self::State,
        renderer: &iced::Renderer,
        theme: &Theme,
        bounds: iced::Rectangle,
        _cursor: mouse::Cursor,
    ) -> Vec<Geometry> {
        let mut frame = Frame::new(renderer, bounds.size());
        let palette = theme.palette();

        let bar_height = bounds.height;

        let bg = Path::rectangle(
            iced::Point::ORIGIN,
            iced::Size::new(bounds.width, bar_height),
        );
        frame.fill(
            &bg,
            Color {
                a: 0.15,
                ..palette.text
            },
        );

        let fill_width = bounds.width * self.progress;
        if fill_width > 0.0 {
            let fill =
                Path::rectangle(iced::Point::ORIGIN, iced::Size::new(fill_width, bar_height));
            frame.fill(&fill, palette.primary);
        }

        vec![frame.into_geometry()]
    }
}
