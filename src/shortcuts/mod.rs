//! Declarative shortcut binding table and matcher.

use std::collections::HashMap;

use crate::input::keystroke::{Key, Keystroke};

/// The fixed catalogue of recognized actions, declared in the order they are
/// evaluated when matching — this order is what makes ambiguous bindings
/// deterministic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionId {
    AppQuit,
    AppInterruptAll,
    CommandMenuToggle,
    DebugBarToggle,
    GatewayProfileToggle,
    GatewayStatusTimelineToggle,
    GatewayRenderTraceToggle,
    ConversationNew,
    ConversationCritiqueOpenOrCreate,
    ConversationNext,
    ConversationPrevious,
    ConversationInterrupt,
    ConversationArchive,
    ConversationTakeover,
    ConversationDelete,
    ConversationTitlesRefreshAll,
    DirectoryAdd,
    DirectoryClose,
}

impl ActionId {
    /// All actions, in fixed declared/evaluation order.
    pub const ALL: &'static [ActionId] = &[
        ActionId::AppQuit,
        ActionId::AppInterruptAll,
        ActionId::CommandMenuToggle,
        ActionId::DebugBarToggle,
        ActionId::GatewayProfileToggle,
        ActionId::GatewayStatusTimelineToggle,
        ActionId::GatewayRenderTraceToggle,
        ActionId::ConversationNew,
        ActionId::ConversationCritiqueOpenOrCreate,
        ActionId::ConversationNext,
        ActionId::ConversationPrevious,
        ActionId::ConversationInterrupt,
        ActionId::ConversationArchive,
        ActionId::ConversationTakeover,
        ActionId::ConversationDelete,
        ActionId::ConversationTitlesRefreshAll,
        ActionId::DirectoryAdd,
        ActionId::DirectoryClose,
    ];

    /// The dotted id string used in the command-menu and keybinding catalog.
    pub fn dotted(&self) -> &'static str {
        match self {
            ActionId::AppQuit => "mux.app.quit",
            ActionId::AppInterruptAll => "mux.app.interrupt-all",
            ActionId::CommandMenuToggle => "mux.command-menu.toggle",
            ActionId::DebugBarToggle => "mux.debug-bar.toggle",
            ActionId::GatewayProfileToggle => "mux.gateway.profile.toggle",
            ActionId::GatewayStatusTimelineToggle => "mux.gateway.status-timeline.toggle",
            ActionId::GatewayRenderTraceToggle => "mux.gateway.render-trace.toggle",
            ActionId::ConversationNew => "mux.conversation.new",
            ActionId::ConversationCritiqueOpenOrCreate => "mux.conversation.critique.open-or-create",
            ActionId::ConversationNext => "mux.conversation.next",
            ActionId::ConversationPrevious => "mux.conversation.previous",
            ActionId::ConversationInterrupt => "mux.conversation.interrupt",
            ActionId::ConversationArchive => "mux.conversation.archive",
            ActionId::ConversationTakeover => "mux.conversation.takeover",
            ActionId::ConversationDelete => "mux.conversation.delete",
            ActionId::ConversationTitlesRefreshAll => "mux.conversation.titles.refresh-all",
            ActionId::DirectoryAdd => "mux.directory.add",
            ActionId::DirectoryClose => "mux.directory.close",
        }
    }

    /// Human-readable title shown in the command menu.
    pub fn title(&self) -> &'static str {
        match self {
            ActionId::AppQuit => "Quit",
            ActionId::AppInterruptAll => "Interrupt active conversation",
            ActionId::CommandMenuToggle => "Toggle command menu",
            ActionId::DebugBarToggle => "Toggle debug bar",
            ActionId::GatewayProfileToggle => "Toggle gateway profile overlay",
            ActionId::GatewayStatusTimelineToggle => "Toggle gateway status timeline",
            ActionId::GatewayRenderTraceToggle => "Toggle render trace overlay",
            ActionId::ConversationNew => "New thread",
            ActionId::ConversationCritiqueOpenOrCreate => "Open or create critique thread",
            ActionId::ConversationNext => "Next conversation",
            ActionId::ConversationPrevious => "Previous conversation",
            ActionId::ConversationInterrupt => "Interrupt conversation",
            ActionId::ConversationArchive => "Archive conversation",
            ActionId::ConversationTakeover => "Take over conversation",
            ActionId::ConversationDelete => "Delete conversation",
            ActionId::ConversationTitlesRefreshAll => "Refresh all conversation titles",
            ActionId::DirectoryAdd => "Add directory",
            ActionId::DirectoryClose => "Close directory",
        }
    }
}

/// A binding parsed from its `"part+part+...+key"` textual form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParsedBinding {
    pub key: Key,
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
    pub meta: bool,
}

impl ParsedBinding {
    /// Equality: key and all four modifier flags must match.
    pub fn matches(&self, stroke: &Keystroke) -> bool {
        self.key == stroke.key
            && self.ctrl == stroke.ctrl
            && self.alt == stroke.alt
            && self.shift == stroke.shift
            && self.meta == stroke.meta
    }
}

/// Parse one `"part+part+...+key"` binding string. Unknown tokens or an
/// unrecognized final key reject the whole binding (`None`).
pub fn parse_binding(spec: &str) -> Option<ParsedBinding> {
    let parts: Vec<&str> = spec.split('+').map(str::trim).collect();
    if parts.is_empty() {
        return None;
    }

    let mut ctrl = false;
    let mut alt = false;
    let mut shift = false;
    let mut meta = false;

    let (modifiers, final_token) = parts.split_at(parts.len() - 1);
    let final_token = final_token[0];

    for part in modifiers {
        match part.to_ascii_lowercase().as_str() {
            "cmd" | "command" | "meta" | "super" => meta = true,
            "ctrl" | "control" => ctrl = true,
            "alt" | "option" => alt = true,
            "shift" => shift = true,
            _ => return None,
        }
    }

    let key = match final_token.to_ascii_lowercase().as_str() {
        "esc" | "escape" => Key::Escape,
        "return" | "enter" => Key::Enter,
        "spacebar" | "space" => Key::Space,
        "tab" => Key::Tab,
        "backspace" => Key::Backspace,
        "up" => Key::Up,
        "down" => Key::Down,
        "left" => Key::Left,
        "right" => Key::Right,
        "home" => Key::Home,
        "end" => Key::End,
        "pageup" | "page up" => Key::PageUp,
        "pagedown" | "page down" => Key::PageDown,
        "delete" | "del" => Key::Delete,
        other => {
            let mut chars = other.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Key::Char(c.to_ascii_lowercase()),
                _ => return None,
            }
        }
    };

    Some(ParsedBinding {
        key,
        ctrl,
        alt,
        shift,
        meta,
    })
}

/// Parse a whole `"a+b, c+d"`-style binding list (comma-separated alternatives).
pub fn parse_bindings(specs: &[&str]) -> Vec<ParsedBinding> {
    specs.iter().filter_map(|s| parse_binding(s)).collect()
}

/// The resolved table: each action maps to zero or more parsed bindings.
/// Unbound actions carry an empty list and are reported as "(unbound)" in
/// the keybinding catalog.
#[derive(Debug, Clone, Default)]
pub struct ResolvedBindings {
    table: HashMap<ActionId, Vec<ParsedBinding>>,
}

impl ResolvedBindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&mut self, action: ActionId, specs: &[&str]) {
        self.table.insert(action, parse_bindings(specs));
    }

    pub fn bindings_for(&self, action: ActionId) -> &[ParsedBinding] {
        self.table.get(&action).map_or(&[], Vec::as_slice)
    }

    pub fn catalog_display(&self, action: ActionId) -> String {
        let bindings = self.bindings_for(action);
        if bindings.is_empty() {
            "(unbound)".to_string()
        } else {
            bindings
                .iter()
                .map(display_binding)
                .collect::<Vec<_>>()
                .join(", ")
        }
    }

    /// The default binding table matching the action catalogue intent
    /// described here.
    pub fn defaults() -> Self {
        let mut table = Self::new();
        table.bind(ActionId::AppQuit, &["ctrl+q"]);
        table.bind(ActionId::AppInterruptAll, &["ctrl+c"]);
        table.bind(ActionId::CommandMenuToggle, &["ctrl+k"]);
        table.bind(ActionId::DebugBarToggle, &["ctrl+d"]);
        table.bind(ActionId::GatewayProfileToggle, &[]);
        table.bind(ActionId::GatewayStatusTimelineToggle, &[]);
        table.bind(ActionId::GatewayRenderTraceToggle, &[]);
        table.bind(ActionId::ConversationNew, &["ctrl+n"]);
        table.bind(ActionId::ConversationCritiqueOpenOrCreate, &[]);
        table.bind(ActionId::ConversationNext, &["ctrl+down"]);
        table.bind(ActionId::ConversationPrevious, &["ctrl+up"]);
        table.bind(ActionId::ConversationInterrupt, &["ctrl+x"]);
        table.bind(ActionId::ConversationArchive, &["ctrl+shift+a"]);
        table.bind(ActionId::ConversationTakeover, &["ctrl+t"]);
        table.bind(ActionId::ConversationDelete, &[]);
        table.bind(ActionId::ConversationTitlesRefreshAll, &[]);
        table.bind(ActionId::DirectoryAdd, &["ctrl+shift+n"]);
        table.bind(ActionId::DirectoryClose, &["ctrl+shift+w"]);
        table
    }
}

fn display_binding(binding: &ParsedBinding) -> String {
    let mut parts = vec![];
    if binding.meta {
        parts.push("cmd".to_string());
    }
    if binding.ctrl {
        parts.push("ctrl".to_string());
    }
    if binding.alt {
        parts.push("alt".to_string());
    }
    if binding.shift {
        parts.push("shift".to_string());
    }
    parts.push(binding.key.to_string());
    parts.join("+")
}

/// Match a decoded keystroke against the resolved bindings table, returning
/// the first action (in [`ActionId::ALL`] order) with a matching binding.
pub fn detect_shortcut(table: &ResolvedBindings, stroke: &Keystroke) -> Option<ActionId> {
    for &action in ActionId::ALL {
        if table
            .bindings_for(action)
            .iter()
            .any(|b| b.matches(stroke))
        {
            return Some(action);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::keystroke::Keystroke;

    #[test]
    fn parse_binding_is_case_insensitive_and_supports_aliases() {
        let b = parse_binding("Cmd+Ctrl+A").unwrap();
        assert!(b.meta);
        assert!(b.ctrl);
        assert_eq!(b.key, Key::Char('a'));

        let esc = parse_binding("esc").unwrap();
        assert_eq!(esc.key, Key::Escape);

        let spacebar = parse_binding("ctrl+spacebar").unwrap();
        assert_eq!(spacebar.key, Key::Space);
        assert!(spacebar.ctrl);
    }

    #[test]
    fn parse_binding_rejects_unknown_tokens() {
        assert!(parse_binding("hyper+a").is_none());
        assert!(parse_binding("ctrl+abc").is_none());
    }

    #[test]
    fn ctrl_c_binding_resolves_to_interrupt_all_action() {
        let mut table = ResolvedBindings::new();
        table.bind(ActionId::AppInterruptAll, &["ctrl+c"]);
        let stroke = Keystroke {
            key: Key::Char('c'),
            ctrl: true,
            alt: false,
            shift: false,
            meta: false,
        };
        assert_eq!(
            detect_shortcut(&table, &stroke),
            Some(ActionId::AppInterruptAll)
        );
    }

    /// The first action (by declared order) whose binding list
    /// contains a matching stroke wins, even when a later action is also
    /// bound to the same stroke.
    #[test]
    fn first_declared_action_wins_on_ambiguous_binding() {
        let mut table = ResolvedBindings::new();
        table.bind(ActionId::AppQuit, &["ctrl+w"]);
        table.bind(ActionId::DirectoryClose, &["ctrl+w"]);
        let stroke = Keystroke {
            key: Key::Char('w'),
            ctrl: true,
            alt: false,
            shift: false,
            meta: false,
        };
        // AppQuit precedes DirectoryClose in ActionId::ALL.
        assert_eq!(detect_shortcut(&table, &stroke), Some(ActionId::AppQuit));
    }

    #[test]
    fn unbound_action_reports_unbound_in_catalog() {
        let table = ResolvedBindings::new();
        assert_eq!(
            table.catalog_display(ActionId::ConversationDelete),
            "(unbound)"
        );
    }
}
