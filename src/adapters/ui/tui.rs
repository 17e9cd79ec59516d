//! Implements InputPort. Inquire-based interactive menu over the use cases.

use crate::adapters::ui::progress;
use crate::domain::{DomainError, OutgoingMail};
use crate::ports::InputPort;
use crate::usecases::{
    AuthService, DumpService, MailService, Overview, OverviewService, WatcherService,
};
use async_trait::async_trait;
use chrono::Local;
use inquire::ui::{Color, RenderConfig, Styled};
use inquire::{CustomType, Password, Select, Text};
use std::fmt::Write as _;
use std::sync::Arc;

/// Prompt styling shared by every inquire prompt.
pub fn apply_theme() {
    let config = RenderConfig::default_colored()
        .with_prompt_prefix(Styled::new("›").with_fg(Color::LightBlue))
        .with_highlighted_option_prefix(Styled::new("▸").with_fg(Color::LightGreen));
    inquire::set_global_render_config(config);
}

/// Ask for the password when it is not configured.
pub fn prompt_password() -> Result<String, DomainError> {
    Password::new("Magister password:")
        .without_confirmation()
        .prompt()
        .map_err(|e| DomainError::Ui(e.to_string()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MenuItem {
    Overview,
    Dump,
    Watch,
    SendMail,
    RefreshToken,
    Quit,
}

impl std::fmt::Display for MenuItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            MenuItem::Overview => "Overview (grades, inbox, assignments)",
            MenuItem::Dump => "Dump data to JSON",
            MenuItem::Watch => "Watch for changes (Ctrl-C to stop)",
            MenuItem::SendMail => "Send a mail",
            MenuItem::RefreshToken => "Refresh access token",
            MenuItem::Quit => "Quit",
        };
        f.write_str(label)
    }
}

/// TUI adapter. Inquire prompts.
pub struct TuiInputPort {
    auth: Arc<AuthService>,
    overview: Arc<OverviewService>,
    dump: Arc<DumpService>,
    mail: Arc<MailService>,
    watcher: Arc<WatcherService>,
}

impl TuiInputPort {
    pub fn new(
        auth: Arc<AuthService>,
        overview: Arc<OverviewService>,
        dump: Arc<DumpService>,
        mail: Arc<MailService>,
        watcher: Arc<WatcherService>,
    ) -> Self {
        Self {
            auth,
            overview,
            dump,
            mail,
            watcher,
        }
    }

    async fn run_item(&self, item: MenuItem) -> Result<(), DomainError> {
        match item {
            MenuItem::Overview => {
                let spinner = progress::spinner("Checking Magister...");
                let overview = self.overview.collect().await;
                spinner.finish_and_clear();
                println!("{}", render_overview(&overview?));
            }
            MenuItem::Dump => {
                let spinner = progress::spinner("Dumping Magister data...");
                let report = self.dump.run().await;
                spinner.finish_and_clear();
                let report = report?;
                println!("Dump complete: {} files written.", report.written.len());
            }
            MenuItem::Watch => self.watcher.run_loop().await?,
            MenuItem::SendMail => {
                let mail = prompt_mail()?;
                if self.mail.send(&mail).await? {
                    println!("Mail sent.");
                } else {
                    println!("Magister rejected the mail.");
                }
            }
            MenuItem::RefreshToken => {
                self.auth.refresh().await?;
                println!("New token saved.");
            }
            MenuItem::Quit => {}
        }
        Ok(())
    }
}

fn prompt_mail() -> Result<OutgoingMail, DomainError> {
    let ui = |e: inquire::InquireError| DomainError::Ui(e.to_string());
    let recipient_id = CustomType::<i64>::new("Recipient person id:")
        .prompt()
        .map_err(ui)?;
    let subject = Text::new("Subject:").prompt().map_err(ui)?;
    let body = Text::new("Body:").prompt().map_err(ui)?;
    Ok(OutgoingMail {
        recipient_id,
        subject,
        body,
    })
}

#[async_trait]
impl InputPort for TuiInputPort {
    async fn run(&self) -> Result<(), DomainError> {
        let items = vec![
            MenuItem::Overview,
            MenuItem::Dump,
            MenuItem::Watch,
            MenuItem::SendMail,
            MenuItem::RefreshToken,
            MenuItem::Quit,
        ];
        loop {
            let choice = Select::new("What do you want to do?", items.clone())
                .prompt()
                .map_err(|e| DomainError::Ui(e.to_string()))?;
            if choice == MenuItem::Quit {
                return Ok(());
            }
            if let Err(e) = self.run_item(choice).await {
                println!("Error: {}", e);
            }
        }
    }
}

/// Plain-text overview for the terminal.
pub fn render_overview(o: &Overview) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "\n📈 Grades");
    match &o.grades {
        Ok(grades) if grades.is_empty() => {
            let _ = writeln!(out, "   No grades yet.");
        }
        Ok(grades) => {
            for g in grades {
                let verdict = if g.is_pass() { "Pass" } else { "Fail" };
                let _ = writeln!(out, "   - {}: {} ({})", g.subject.description, g.value, verdict);
            }
        }
        Err(e) => {
            let _ = writeln!(out, "   ! Could not fetch grades: {}", e);
        }
    }

    let _ = writeln!(out, "\n📧 Inbox");
    match &o.inbox {
        Ok(Some(inbox)) if inbox.unread > 0 => {
            let _ = writeln!(out, "   You have {} unread emails!", inbox.unread);
            for m in &inbox.latest {
                let _ = writeln!(
                    out,
                    "   - [{}] {}: {}",
                    m.sent_at.with_timezone(&Local).format("%d/%m"),
                    m.sender_name(),
                    m.subject
                );
            }
        }
        Ok(Some(_)) => {
            let _ = writeln!(out, "   No new mail.");
        }
        Ok(None) => {
            let _ = writeln!(out, "   No inbox folder found.");
        }
        Err(e) => {
            let _ = writeln!(out, "   ! Could not fetch mail: {}", e);
        }
    }

    let _ = writeln!(out, "\n📝 Assignments");
    match &o.open_assignments {
        Ok(list) if list.is_empty() => {
            let _ = writeln!(out, "   No open assignments.");
        }
        Ok(list) => {
            for a in list {
                let _ = writeln!(
                    out,
                    "   - DUE {}: {}",
                    a.deadline.with_timezone(&Local).format("%d-%m %H:%M"),
                    a.title
                );
            }
        }
        Err(e) => {
            let _ = writeln!(out, "   ! Could not fetch assignments: {}", e);
        }
    }

    out
}
