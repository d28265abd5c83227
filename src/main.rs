mod app;
mod config;
mod gateway;
mod input;
mod logging;
mod model;
mod store;
mod ui;
mod validate;
mod view;

use anyhow::{Context, Result};
use app::{App, Mode, Submission};
use clap::Parser;
use config::{Command, Config};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use gateway::{Gateway, HttpGateway};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io::{self, Stdout};
use store::{ArticleStore, StoreEvent};
use tokio::sync::{broadcast, mpsc};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::parse();
    logging::init(config.log_target().as_deref())?;

    let gateway = HttpGateway::new(&config.api_url, config.timeout())
        .with_context(|| format!("bad api url {}", config.api_url))?;
    info!(api_url = %config.api_url, "starting");

    match &config.command {
        Some(Command::List { skip, limit }) => print_page(&gateway, *skip, *limit).await,
        Some(Command::Show { id }) => print_article(&gateway, id).await,
        None => {
            let store = ArticleStore::new(gateway);
            let mut terminal = setup_terminal()?;
            let res = run(&mut terminal, store, config.page_size()).await;
            restore_terminal(&mut terminal)?;
            res
        }
    }
}

async fn print_page(gateway: &impl Gateway, skip: usize, limit: usize) -> Result<()> {
    let articles = gateway.list_page(skip, limit).await.context("listing articles")?;
    for a in &articles {
        println!("{:<38} {:<10} {:<7} {}  {}", a.id, a.status, a.category, a.date_line(), a.title);
    }
    Ok(())
}

async fn print_article(gateway: &impl Gateway, id: &str) -> Result<()> {
    let a = gateway.get(id).await.with_context(|| format!("fetching article {id}"))?;
    println!("{}\nBy {}  |  {}  |  {}  |  Published: {}\n", a.title, a.author, a.category, a.status, a.date_line());
    println!("{}", a.content);
    Ok(())
}

async fn run<G: Gateway>(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    store: ArticleStore<G>,
    page_size: usize,
) -> Result<()> {
    let mut events = store.subscribe();
    // Form saves report back so the form can close or unlock.
    let (tx, mut rx) = mpsc::channel::<(u64, bool)>(1);

    let mut app = App::new(page_size);

    spawn_fetch(&store);

    loop {
        loop {
            match events.try_recv() {
                Ok(StoreEvent::Changed) => app.refresh(store.snapshot()),
                Ok(StoreEvent::Notice(n)) => app.notice(n),
                Err(broadcast::error::TryRecvError::Lagged(_)) => app.refresh(store.snapshot()),
                Err(_) => break,
            }
        }
        while let Ok((token, ok)) = rx.try_recv() {
            app.form_saved(token, ok);
        }

        terminal.draw(|f| ui::draw(f, &app))?;

        match input::poll_action(&app.mode)? {
            input::Action::Quit => break,
            input::Action::Down => app.move_down(),
            input::Action::Up => app.move_up(),
            input::Action::NextPage => app.next_page(),
            input::Action::PrevPage => app.prev_page(),
            input::Action::ToggleFull => app.show_full = !app.show_full,

            input::Action::Refresh => {
                if !app.snapshot.loading {
                    app.set_status("Refreshing…");
                    spawn_fetch(&store);
                }
            }

            input::Action::New => app.open_create(chrono::Utc::now()),
            input::Action::Edit => app.open_edit(),
            input::Action::Delete => app.ask_delete(),

            input::Action::Confirm => {
                if let Mode::ConfirmDelete(id) = std::mem::replace(&mut app.mode, Mode::Browse) {
                    if let Some(a) = store.find(&id) {
                        app.set_status(format!("Deleting \"{}\"…", a.title));
                    }
                    let store = store.clone();
                    tokio::spawn(async move {
                        // failure already surfaced as a notice
                        let _ = store.delete(&id).await;
                    });
                }
            }
            input::Action::Cancel => app.cancel(),

            input::Action::StartSearch => {
                app.mode = Mode::Search;
                app.set_status("Search: type to filter titles, Enter to keep, Esc/Ctrl+U clears");
            }
            input::Action::EndSearch => {
                app.mode = Mode::Browse;
                let matched = app.page_view().matched;
                app.set_status(format!("Search applied ({matched} results)"));
            }
            input::Action::SearchChar(c) => {
                let mut q = app.snapshot.search_query.clone();
                q.push(c);
                store.set_search_query(q);
                app.search_changed(store.snapshot());
            }
            input::Action::SearchBackspace => {
                let mut q = app.snapshot.search_query.clone();
                q.pop();
                store.set_search_query(q);
                app.search_changed(store.snapshot());
            }
            input::Action::ClearSearch => {
                store.set_search_query("");
                app.search_changed(store.snapshot());
                app.mode = Mode::Browse;
                app.set_status("Search cleared.");
            }

            input::Action::FormChar(c) => app.form_input(c),
            input::Action::FormBackspace => app.form_backspace(),
            input::Action::FormNext => app.form_focus(1),
            input::Action::FormPrev => app.form_focus(-1),
            input::Action::Submit => {
                if let Some((token, submission)) = app.submit_form() {
                    let store = store.clone();
                    let tx = tx.clone();
                    tokio::spawn(async move {
                        let ok = match submission {
                            Submission::Create(form) => store.create(form).await.is_ok(),
                            Submission::Update(id, patch) => store.update(&id, patch).await.is_ok(),
                        };
                        let _ = tx.send((token, ok)).await;
                    });
                }
            }

            input::Action::None => {}
        }
    }

    Ok(())
}

fn spawn_fetch<G: Gateway>(store: &ArticleStore<G>) {
    let store = store.clone();
    tokio::spawn(async move { store.fetch_all().await });
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    Ok(Terminal::new(backend)?)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}
