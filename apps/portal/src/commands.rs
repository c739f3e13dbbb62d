//! Command Loop
//!
//! Reads commands from stdin, drives the session controller, and
//! renders its observed state. Phase transitions are reported from the
//! observer channel, so what the user sees is exactly what any other
//! consumer of the controller would see.

use std::sync::Arc;

use catalog::CatalogClient;
use session::{
    HttpSessionStore, Phase, Profile, SessionController, SessionStore, SignInCredentials,
    SignUpCredentials, SignUpOutcome,
};
use tokio::io::{AsyncBufReadExt, BufReader};

/// Data API access, available only when a hosted backend is configured
pub struct CatalogHandle {
    pub client: CatalogClient,
    pub store: Arc<HttpSessionStore>,
}

pub async fn run<S>(store: Arc<S>, catalog: Option<CatalogHandle>) -> anyhow::Result<()>
where
    S: SessionStore + Send + Sync + 'static,
{
    let controller = SessionController::start(store);

    // Report phase transitions as they are observed.
    let mut observer = controller.observe();
    let watcher = tokio::spawn(async move {
        let mut last_phase = observer.borrow_and_update().phase.clone();
        while observer.changed().await.is_ok() {
            let phase = observer.borrow_and_update().phase.clone();
            if phase == last_phase {
                continue;
            }
            match &phase {
                Phase::Initializing => {}
                Phase::Authenticated(session) => {
                    tracing::info!(
                        user = %session.display_name(),
                        email = %session.email,
                        "Signed in"
                    );
                }
                Phase::Unauthenticated { last_error: Some(message) } => {
                    tracing::warn!(message = %message, "Not signed in");
                }
                Phase::Unauthenticated { last_error: None } => {
                    tracing::info!("Signed out");
                }
            }
            last_phase = phase;
        }
    });

    println!("Education portal. Type 'help' for commands.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let mut parts = line.split_whitespace();
        let Some(command) = parts.next() else {
            continue;
        };
        let args: Vec<&str> = parts.collect();

        match command {
            "help" => print_help(),
            "signin" => sign_in(&controller, &args).await,
            "signup" => sign_up(&controller, &args).await,
            "signout" => match controller.sign_out().await {
                Ok(()) => {}
                Err(err) => println!("{}", err.display_message()),
            },
            "whoami" => whoami(&controller),
            "courses" => courses(&catalog).await,
            "progress" => progress(&controller, &catalog).await,
            "quit" | "exit" => break,
            other => println!("Unknown command '{other}'. Type 'help'."),
        }
    }

    controller.shutdown().await;
    watcher.abort();
    Ok(())
}

fn print_help() {
    println!("Commands:");
    println!("  signin <email> <password>");
    println!("  signup <email> <password> [display name...]");
    println!("  signout");
    println!("  whoami");
    println!("  courses");
    println!("  progress");
    println!("  quit");
}

async fn sign_in<S>(controller: &SessionController<S>, args: &[&str])
where
    S: SessionStore + Send + Sync + 'static,
{
    let [email, password] = args else {
        println!("Usage: signin <email> <password>");
        return;
    };
    let credentials = match SignInCredentials::new(*email, *password) {
        Ok(credentials) => credentials,
        Err(err) => {
            println!("{}", err.display_message());
            return;
        }
    };
    if let Err(err) = controller.submit_sign_in(&credentials).await {
        println!("{}", err.display_message());
    }
}

async fn sign_up<S>(controller: &SessionController<S>, args: &[&str])
where
    S: SessionStore + Send + Sync + 'static,
{
    let [email, password, name @ ..] = args else {
        println!("Usage: signup <email> <password> [display name...]");
        return;
    };
    let mut profile = Profile::new();
    if !name.is_empty() {
        profile = profile.with_display_name(name.join(" "));
    }

    let credentials = match SignUpCredentials::new(*email, *password, profile) {
        Ok(credentials) => credentials,
        Err(err) => {
            println!("{}", err.display_message());
            return;
        }
    };
    match controller.submit_sign_up(&credentials).await {
        Ok(SignUpOutcome::ConfirmationRequired) => {
            println!("Account created. Check your email to confirm, then sign in.");
        }
        Ok(SignUpOutcome::Active(_)) => {}
        Err(err) => println!("{}", err.display_message()),
    }
}

fn whoami<S>(controller: &SessionController<S>)
where
    S: SessionStore + Send + Sync + 'static,
{
    let state = controller.state();
    match state.phase.session() {
        Some(session) => {
            println!("{} <{}>", session.display_name(), session.email);
            if let Some(institution) = &session.profile.institution {
                println!("  institution: {institution}");
            }
            if let Some(field) = &session.profile.field_of_study {
                println!("  field of study: {field}");
            }
        }
        None => println!("Not signed in."),
    }
}

async fn courses(catalog: &Option<CatalogHandle>) {
    let Some(catalog) = catalog else {
        println!("Course catalog requires a hosted backend.");
        return;
    };
    let token = catalog.store.access_token();
    match catalog.client.courses(token.as_deref()).await {
        Ok(courses) if courses.is_empty() => println!("No courses published yet."),
        Ok(courses) => {
            for course in courses {
                let subject = course.subject.as_deref().unwrap_or("general");
                println!("[{subject}] {}", course.title);
            }
        }
        Err(err) => println!("{err}"),
    }
}

async fn progress<S>(controller: &SessionController<S>, catalog: &Option<CatalogHandle>)
where
    S: SessionStore + Send + Sync + 'static,
{
    let Some(catalog) = catalog else {
        println!("Progress tracking requires a hosted backend.");
        return;
    };
    let state = controller.state();
    let Some(session) = state.phase.session() else {
        println!("Sign in to see your progress.");
        return;
    };

    let token = catalog.store.access_token();
    match catalog
        .client
        .student_progress(session.user_id, token.as_deref())
        .await
    {
        Ok(rows) if rows.is_empty() => println!("No progress recorded yet."),
        Ok(rows) => {
            for row in rows {
                println!(
                    "course {}: {}% ({} lessons done)",
                    row.course_id, row.progress, row.completed_lessons
                );
            }
        }
        Err(err) => println!("{err}"),
    }
}
