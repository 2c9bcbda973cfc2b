use crate::{
    accounts::{AccountStore, ProfileOutcome, UpdateOutcome, UserUpdate},
    activity::ActivityLog,
    catalog,
    clock::SystemClock,
    config::Config,
    error::Error,
    model::{Role, User},
    password,
    session::Session,
    simulate::{self, Action},
    store::FileStore,
    Args,
};
use anyhow::Result;
use chrono::{DateTime, Utc};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::PathBuf;

pub type Accounts = AccountStore<FileStore, SystemClock>;

pub struct Context {
    pub args: Args,
    pub run_id: String,
    pub config: Config,
    pub accounts: RefCell<Accounts>,
    pub activity: RefCell<ActivityLog>,
    /// Data file imported for the web-services page
    pub data_file: RefCell<Option<PathBuf>>,
}

/// Dashboard pages, keyed by the id stored in the `active_page` slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Dashboard,
    TestCases,
    WebServices,
    Reports,
    Profile,
    UserManagement,
}

impl Page {
    pub const ALL: [Page; 6] = [
        Page::Dashboard,
        Page::TestCases,
        Page::WebServices,
        Page::Reports,
        Page::Profile,
        Page::UserManagement,
    ];

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.id() == id)
    }

    pub fn id(&self) -> &'static str {
        match self {
            Self::Dashboard => "dashboard",
            Self::TestCases => "test-cases",
            Self::WebServices => "web-services",
            Self::Reports => "reports",
            Self::Profile => "profile",
            Self::UserManagement => "user-management",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::Dashboard => "Dashboard",
            Self::TestCases => "Test Cases",
            Self::WebServices => "Web Services",
            Self::Reports => "Reports",
            Self::Profile => "Profile",
            Self::UserManagement => "User Management",
        }
    }

    pub fn allowed_for(&self, role: Role) -> bool {
        *self != Self::UserManagement || role == Role::Admin
    }

    /// Page to show after login: the saved one if still reachable, else the dashboard
    pub fn restore(saved: Option<&str>, role: Role) -> Self {
        saved
            .and_then(Self::from_id)
            .filter(|p| p.allowed_for(role))
            .unwrap_or(Self::Dashboard)
    }
}

enum Flow {
    Continue,
    Logout,
    Exit,
}

fn verbose(ctx: &Context, message: &str) {
    if ctx.args.verbose {
        eprintln!("[VERBOSE] {}", message);
    }
}

/// Print a store error inline; the console keeps running
fn report<T>(result: crate::error::Result<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            eprintln!("Error: {}", e);
            None
        }
    }
}

fn prompt(rl: &mut DefaultEditor, label: &str) -> Result<Option<String>> {
    match rl.readline(label) {
        Ok(line) => Ok(Some(line)),
        Err(ReadlineError::Interrupted | ReadlineError::Eof) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn run_repl(ctx: Context) -> Result<()> {
    let mut rl = DefaultEditor::new()?;

    println!("testdeck - type /help for commands, /exit to quit");

    loop {
        let Some(session) = resume_or_login(&ctx, &mut rl)? else {
            break;
        };
        match session_loop(&ctx, &mut rl, session)? {
            Flow::Exit => break,
            Flow::Logout | Flow::Continue => continue,
        }
    }

    Ok(())
}

fn resume_or_login(ctx: &Context, rl: &mut DefaultEditor) -> Result<Option<Session>> {
    let resumed = report(ctx.accounts.borrow_mut().current_session()).flatten();
    if let Some(session) = resumed {
        println!("Welcome back, {}", greeting_name(ctx, &session));
        return Ok(Some(session));
    }

    println!("Please log in.");
    loop {
        let Some(user_id) = prompt(rl, "User ID: ")? else {
            return Ok(None);
        };
        let user_id = user_id.trim().to_string();
        let Some(pass) = prompt(rl, "Password: ")? else {
            return Ok(None);
        };
        let Some(remember) = prompt(rl, "Remember me? [y/N] ")? else {
            return Ok(None);
        };
        let remember_me = remember.trim().eq_ignore_ascii_case("y");

        if let Err(e) = password::validate_login_form(&user_id, &pass) {
            eprintln!("{}", e);
            continue;
        }

        let result = ctx.accounts.borrow_mut().login(&user_id, &pass, remember_me);
        match result {
            Ok(session) => {
                let _ = ctx.activity.borrow_mut().login_ok(&session.id, remember_me);
                println!("Login successful! Welcome, {}", greeting_name(ctx, &session));
                let flagged = ctx
                    .accounts
                    .borrow_mut()
                    .require_first_login_password_change(&session);
                report(flagged);
                return Ok(Some(session));
            }
            Err(Error::LockedOut { until }) => {
                let _ = ctx.activity.borrow_mut().locked_out(&user_id, until);
                eprintln!("{}", Error::LockedOut { until });
                verbose(ctx, &format!("Locked until {}", until.to_rfc3339()));
            }
            Err(e) => {
                let _ = ctx
                    .activity
                    .borrow_mut()
                    .login_failed(&user_id, &e.to_string());
                eprintln!("{}", e);
            }
        }
    }
}

fn greeting_name(ctx: &Context, session: &Session) -> String {
    if session.name.is_none() {
        if let Ok(Some(user)) = ctx.accounts.borrow().lookup_by_id(&session.id) {
            if !user.name.is_empty() {
                return user.name;
            }
        }
    }
    session.display_name().to_string()
}

fn session_loop(ctx: &Context, rl: &mut DefaultEditor, mut session: Session) -> Result<Flow> {
    let pending = report(ctx.accounts.borrow().pending_password_change()).flatten();
    if let Some(request) = pending.filter(|r| r.user_id == session.id) {
        if let Some(message) = &request.message {
            println!("{}", message);
        }
        if !change_password_flow(ctx, rl, &session.id, true)? {
            return Ok(Flow::Exit);
        }
    }

    let saved = report(ctx.accounts.borrow().active_page()).flatten();
    let page = Page::restore(saved.as_deref(), session.role);
    show_page(ctx, page, &session);

    loop {
        let Some(line) = prompt(rl, &format!("{}> ", session.id))? else {
            return Ok(Flow::Exit);
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        rl.add_history_entry(line)?;

        if !line.starts_with('/') {
            println!("Commands start with '/'. Type /help for the list.");
            continue;
        }

        // The session may have expired while idle
        let valid = ctx.accounts.borrow_mut().is_session_valid();
        let Some(valid) = report(valid) else {
            continue;
        };
        if !valid {
            let _ = ctx.activity.borrow_mut().session_expired();
            println!("Your session has expired. Please log in again.");
            return Ok(Flow::Logout);
        }
        let fresh = report(ctx.accounts.borrow_mut().current_session()).flatten();
        if let Some(fresh) = fresh {
            session = fresh;
        }

        match handle_command(ctx, rl, &session, line) {
            Ok(Flow::Continue) => {}
            Ok(flow) => return Ok(flow),
            Err(e) => eprintln!("Error: {}", e),
        }
    }
}

fn handle_command(ctx: &Context, rl: &mut DefaultEditor, session: &Session, line: &str) -> Result<Flow> {
    let words = match shell_words::split(line) {
        Ok(words) => words,
        Err(e) => {
            eprintln!("Could not parse command: {}", e);
            return Ok(Flow::Continue);
        }
    };
    let Some((cmd, args)) = words.split_first() else {
        return Ok(Flow::Continue);
    };

    match cmd.as_str() {
        "/exit" | "/quit" => return Ok(Flow::Exit),
        "/help" => print_help(session.role),
        "/logout" => {
            ctx.accounts.borrow_mut().logout()?;
            let _ = ctx.activity.borrow_mut().logout(&session.id);
            println!("Logged out.");
            return Ok(Flow::Logout);
        }
        "/whoami" => {
            let expiry = DateTime::<Utc>::from_timestamp_millis(session.expiry)
                .map(|t| t.to_rfc3339())
                .unwrap_or_else(|| session.expiry.to_string());
            println!("User: {} ({})", greeting_name(ctx, session), session.id);
            println!("Email: {}", session.email);
            println!("Role: {}", session.role.label());
            println!("Session expires: {}", expiry);
        }
        "/session" => {
            println!("Run: {}", ctx.run_id);
            println!("Activity log: {:?}", ctx.activity.borrow().path);
            println!("Storage: {:?}", ctx.config.storage_path());
            let token = ctx.accounts.borrow().csrf_token()?;
            if let Some(token) = token {
                verbose(ctx, &format!("CSRF token: {}", token));
            }
        }
        "/page" => handle_page_command(ctx, session, args)?,
        "/passwd" => {
            change_password_flow(ctx, rl, &session.id, false)?;
        }
        "/profile" => handle_profile_command(ctx, session, args)?,
        "/tests" => handle_tests_command(args),
        "/form" => handle_form_command(ctx, session, args),
        "/run" => {
            println!("Starting test execution...");
            let message = simulate::run(&Action::RunTest, &ctx.config.simulation);
            let _ = ctx.activity.borrow_mut().simulated(&session.id, "run_test", "");
            println!("{}", message);
        }
        "/import" => handle_import_command(ctx, args),
        "/webservices" => handle_web_services_command(ctx, session, args),
        "/download" => match args.first() {
            Some(report) => {
                let message = simulate::run(&Action::Download(report.clone()), &ctx.config.simulation);
                let _ = ctx
                    .activity
                    .borrow_mut()
                    .simulated(&session.id, "download", report);
                println!("{}", message);
            }
            None => println!("Usage: /download <report-id>"),
        },
        "/users" | "/user" | "/adduser" | "/edituser" | "/deluser" => {
            if session.role != Role::Admin {
                println!("User management is only available to administrators.");
            } else {
                handle_admin_command(ctx, session, cmd, args)?;
            }
        }
        _ => println!("Unknown command: {}", cmd),
    }
    Ok(Flow::Continue)
}

fn print_help(role: Role) {
    println!("Commands:");
    println!("  /exit                      - quit (session is kept)");
    println!("  /help                      - show commands");
    println!("  /logout                    - end the session");
    println!("  /whoami                    - show the logged-in user");
    println!("  /session                   - show run, log and storage info");
    println!("  /page [id]                 - show or switch page");
    println!("  /passwd                    - change your password");
    println!("  /profile <name> <email>    - edit your profile");
    println!("Tests:");
    println!("  /tests [type]              - list test types or a type's fields");
    println!("  /form <type> KEY=VALUE...  - submit a test form");
    println!("  /run                       - start a test run");
    println!("  /import <file>             - import a test data file");
    println!("  /webservices <type>...     - run web-service tests on the imported file");
    println!("  /download <report-id>      - download a report");
    if role == Role::Admin {
        println!("User management:");
        println!("  /users                                   - list users");
        println!("  /user <id|email>                         - show one user");
        println!("  /adduser <name> <email> <password> <role>");
        println!("  /edituser <old-email> <id> <name> <email> <password> <role>");
        println!("  /deluser <id|email>");
    }
}

fn show_page(ctx: &Context, page: Page, session: &Session) {
    println!("== {} ==", page.title());
    match page {
        Page::Dashboard => {
            println!("Logged in as {} ({})", greeting_name(ctx, session), session.role.label());
        }
        Page::TestCases => handle_tests_command(&[]),
        Page::WebServices => {
            match ctx.data_file.borrow().as_ref() {
                Some(path) => println!("Data file: {}", path.display()),
                None => println!("No data file imported. Use /import <file>."),
            }
            println!("Select test types with /webservices <type>...");
        }
        Page::Reports => println!("Use /download <report-id> to fetch a report."),
        Page::Profile => {
            println!("Name: {}", greeting_name(ctx, session));
            println!("Email: {}", session.email);
        }
        Page::UserManagement => {
            if let Err(e) = print_users(ctx) {
                eprintln!("Error: {}", e);
            }
        }
    }
}

fn handle_page_command(ctx: &Context, session: &Session, args: &[String]) -> Result<()> {
    let Some(id) = args.first() else {
        let current = ctx.accounts.borrow().active_page()?;
        let current = Page::restore(current.as_deref(), session.role);
        for page in Page::ALL.iter().filter(|p| p.allowed_for(session.role)) {
            let marker = if *page == current { " *" } else { "" };
            println!("  {}: {}{}", page.id(), page.title(), marker);
        }
        return Ok(());
    };

    match Page::from_id(id) {
        Some(page) if page.allowed_for(session.role) => {
            ctx.accounts.borrow_mut().set_active_page(page.id())?;
            show_page(ctx, page, session);
        }
        Some(_) => println!("User management is only available to administrators."),
        None => println!("Unknown page: {}. Use /page to list.", id),
    }
    Ok(())
}

/// Prompt for current/new/confirm and apply the change.
///
/// A forced change keeps asking until it succeeds; returns false if input ended first.
fn change_password_flow(ctx: &Context, rl: &mut DefaultEditor, user_id: &str, forced: bool) -> Result<bool> {
    loop {
        let Some(current) = prompt(rl, "Current password: ")? else {
            return Ok(false);
        };
        let Some(new) = prompt(rl, "New password: ")? else {
            return Ok(false);
        };
        let Some(confirm) = prompt(rl, "Confirm new password: ")? else {
            return Ok(false);
        };

        let result = password::validate_new_password(&current, &new, &confirm).and_then(|_| {
            ctx.accounts
                .borrow_mut()
                .change_password(user_id, &current, &new)
        });

        match result {
            Ok(()) => {
                let _ = ctx.activity.borrow_mut().password_changed(user_id, forced);
                println!("Password changed successfully!");
                return Ok(true);
            }
            Err(Error::Authentication) => eprintln!("Current password is incorrect"),
            Err(e @ Error::Validation(_)) => {
                eprintln!("{}", e);
                println!("Strength: {}", strength_label(password::strength(&new)));
            }
            Err(e) => eprintln!("Error: {}", e),
        }

        if !forced {
            return Ok(false);
        }
    }
}

fn strength_label(strength: u32) -> String {
    let label = match strength {
        0..=29 => "weak",
        30..=59 => "fair",
        _ => "strong",
    };
    format!("{}% ({})", strength, label)
}

fn handle_profile_command(ctx: &Context, session: &Session, args: &[String]) -> Result<()> {
    let [name, email] = args else {
        println!("Usage: /profile <name> <email>");
        return Ok(());
    };

    let result = ctx.accounts.borrow_mut().update_profile(name, email);
    match result {
        Ok(ProfileOutcome::Saved) => {
            let _ = ctx.activity.borrow_mut().profile_updated(&session.id, true);
            println!("Profile updated successfully");
        }
        Ok(ProfileOutcome::SessionOnly) => {
            let _ = ctx.activity.borrow_mut().profile_updated(&session.id, false);
            println!("Profile updated successfully (Note: Default user data is not permanently saved in this demo)");
        }
        Err(e @ (Error::Validation(_) | Error::NotFound(_))) => eprintln!("{}", e),
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

fn handle_tests_command(args: &[String]) {
    match args.first() {
        Some(name) => {
            let fields = catalog::fields_for(name);
            if fields.is_empty() {
                println!("Unknown test type: {}", name);
                return;
            }
            for field in fields {
                let required = if field.required { " (required)" } else { "" };
                println!("  {} - {} [{}]{}", field.id, field.label, field.kind.as_str(), required);
            }
        }
        None => {
            println!("Test types:");
            for test_type in catalog::TEST_TYPES {
                println!("  {} ({} fields)", test_type.name, test_type.fields.len());
            }
        }
    }
}

/// Parse `KEY=VALUE` words into form values
fn parse_assignments(words: &[String]) -> std::result::Result<HashMap<String, String>, String> {
    words
        .iter()
        .map(|word| {
            word.split_once('=')
                .map(|(k, v)| (k.trim().to_string(), v.to_string()))
                .ok_or_else(|| format!("Expected KEY=VALUE, got '{}'", word))
        })
        .collect()
}

fn handle_form_command(ctx: &Context, session: &Session, args: &[String]) {
    let Some((name, rest)) = args.split_first() else {
        println!("Usage: /form <type> KEY=VALUE...");
        return;
    };
    let values = match parse_assignments(rest) {
        Ok(values) => values,
        Err(e) => {
            eprintln!("{}", e);
            return;
        }
    };

    match catalog::submit(name, &values) {
        Ok(message) => {
            let _ = ctx.activity.borrow_mut().simulated(&session.id, "submit", name);
            println!("{}", message);
        }
        Err(e) => eprintln!("{}", e),
    }
}

fn handle_import_command(ctx: &Context, args: &[String]) {
    let Some(file) = args.first() else {
        println!("Usage: /import <file>");
        return;
    };
    let path = PathBuf::from(file);
    match simulate::preview(&path) {
        Ok(preview) => {
            println!("File: {} ({})", preview.name, preview.size_kb);
            println!("{}", preview.content);
            *ctx.data_file.borrow_mut() = Some(path);
        }
        Err(e) => eprintln!("Could not read {}: {}", file, e),
    }
}

fn handle_web_services_command(ctx: &Context, session: &Session, args: &[String]) {
    let data_file = ctx.data_file.borrow().clone();
    match simulate::web_services(args, data_file.as_deref()) {
        Ok(action) => {
            println!("Running web-service tests...");
            let message = simulate::run(&action, &ctx.config.simulation);
            let _ = ctx
                .activity
                .borrow_mut()
                .simulated(&session.id, "web_services", &args.join(", "));
            println!("{}", message);
        }
        Err(e) => eprintln!("{}", e),
    }
}

fn print_users(ctx: &Context) -> Result<()> {
    let users = ctx.accounts.borrow().list_users()?;
    println!(
        "  {:<6} {:<20} {:<28} {:<6} {:<12}",
        "ID", "Name", "Email", "Role", "Last login"
    );
    for user in &users {
        print_user_row(user);
    }
    Ok(())
}

fn print_user_row(user: &User) {
    let first = if user.first_login { " (first login)" } else { "" };
    println!(
        "  {:<6} {:<20} {:<28} {:<6} {:<12}{}",
        user.id,
        user.name,
        user.email,
        user.role.label(),
        user.last_login,
        first
    );
}

fn parse_role(s: &str) -> Option<Role> {
    let role = Role::from_str(s);
    if role.is_none() {
        println!("Unknown role: {}. Use admin or user.", s);
    }
    role
}

fn handle_admin_command(ctx: &Context, session: &Session, cmd: &str, args: &[String]) -> Result<()> {
    match (cmd, args) {
        ("/users", _) => print_users(ctx)?,
        ("/user", [key]) => {
            let found = {
                let accounts = ctx.accounts.borrow();
                match accounts.lookup_by_id(key)? {
                    Some(user) => Some(user),
                    None => accounts.lookup_by_email(key)?,
                }
            };
            match found {
                Some(user) => print_user_row(&user),
                None => println!("User data not found for ID or Email: {}", key),
            }
        }
        ("/adduser", [name, email, pass, role]) => {
            let Some(role) = parse_role(role) else {
                return Ok(());
            };

            let result = ctx.accounts.borrow_mut().create_user(name, email, pass, role);
            match result {
                Ok(id) => {
                    let _ = ctx.activity.borrow_mut().user_created(&session.id, &id, role.as_str());
                    println!(
                        "User {} ({}) added successfully with ID: {} and role: {}",
                        name, email, id, role
                    );
                }
                Err(e @ (Error::AlreadyExists(_) | Error::Validation(_))) => eprintln!("{}", e),
                Err(e) => return Err(e.into()),
            }
        }
        ("/edituser", [old_email, id, name, email, pass, role]) => {
            let Some(role) = parse_role(role) else {
                return Ok(());
            };
            let update = UserUpdate {
                id: id.clone(),
                name: name.clone(),
                email: email.clone(),
                password: pass.clone(),
                role,
            };

            let result = ctx.accounts.borrow_mut().update_user(old_email, update);
            let outcome = match result {
                Ok(outcome) => outcome,
                Err(e @ (Error::AlreadyExists(_) | Error::Validation(_) | Error::NotFound(_))) => {
                    eprintln!("{}", e);
                    return Ok(());
                }
                Err(e) => return Err(e.into()),
            };
            let label = match outcome {
                UpdateOutcome::Saved => {
                    println!("User {} ({}) updated successfully", name, email);
                    "saved"
                }
                UpdateOutcome::NotPersisted => {
                    println!("Default user {} settings would be updated in a real application", old_email);
                    "not_persisted"
                }
                UpdateOutcome::EmailChangeRejected => {
                    println!("Cannot change email for default user: {}", old_email);
                    "email_change_rejected"
                }
            };
            let _ = ctx.activity.borrow_mut().user_updated(&session.id, old_email, label);
        }
        ("/deluser", [key]) => {
            let result = ctx.accounts.borrow_mut().delete_user(key);
            match result {
                Ok(0) => println!("User data not found for ID or Email: {}", key),
                Ok(removed) => {
                    let _ = ctx.activity.borrow_mut().user_deleted(&session.id, key, removed);
                    println!("User {} deleted successfully", key);
                }
                Err(e @ Error::BuiltInProtected(_)) => eprintln!("{}", e),
                Err(e) => return Err(e.into()),
            }
        }
        _ => println!("Wrong arguments for {}. Type /help for usage.", cmd),
    }
    Ok(())
}
