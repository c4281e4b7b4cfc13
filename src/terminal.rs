use anyhow::{Context, Result};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use std::io::{self, Write};
use std::panic;

pub(crate) fn setup_terminal() -> Result<()> {
    enable_raw_mode().context("failed to enable raw mode")?;
    execute!(io::stdout(), EnterAlternateScreen).context("failed to enter alternate screen")?;
    Ok(())
}

/// Undoes [`setup_terminal`] on any writer. Shared by normal shutdown and the panic hook.
fn leave_screen(out: &mut impl Write) -> Result<()> {
    disable_raw_mode().context("failed to disable raw mode")?;
    execute!(out, LeaveAlternateScreen).context("failed to leave alternate screen")?;
    Ok(())
}

pub(crate) fn restore_terminal(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
) -> Result<()> {
    leave_screen(terminal.backend_mut())?;
    terminal.show_cursor().context("failed to show cursor")?;
    Ok(())
}

/// The panic message would otherwise land on the alternate screen and vanish.
pub(crate) fn install_panic_hook() {
    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        let _ = leave_screen(&mut io::stdout());
        tracing::error!(%panic_info, "panic");
        original_hook(panic_info);
    }));
}
