//! Debugger menu actions for camlpad.
//! camlpad 除錯選單動作。
//!
//! Actions hold an explicit session handle created when the workbench starts;
//! the session defines what each request does.

use std::sync::Arc;

/// Operations the debugger session exposes to menu actions.
/// 除錯工作階段提供給選單動作的操作。
pub trait DebuggerSession: Send + Sync {
    /// Runs backwards until a breakpoint or the start of the program.
    /// 反向執行直到中斷點或程式開頭。
    fn reverse(&self);
}

/// A menu or toolbar action of the workbench.
pub trait WorkbenchAction {
    fn id(&self) -> &'static str;
    fn label(&self) -> &'static str;
    fn run(&self);
}

/// "Reverse" entry of the Debug menu.
/// 除錯選單中的「反向執行」。
pub struct ReverseAction {
    session: Arc<dyn DebuggerSession>,
}

impl ReverseAction {
    pub const ID: &'static str = "camlpad.debug.reverse";

    pub fn new(session: Arc<dyn DebuggerSession>) -> Self {
        Self { session }
    }
}

impl WorkbenchAction for ReverseAction {
    fn id(&self) -> &'static str {
        Self::ID
    }

    fn label(&self) -> &'static str {
        "Reverse"
    }

    fn run(&self) {
        log::debug!("{} invoked", Self::ID);
        self.session.reverse();
    }
}
