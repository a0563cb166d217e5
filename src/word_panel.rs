#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PanelTab {
    #[default]
    Analysis,
    Translation,
    Notes,
}

impl PanelTab {
    pub fn all() -> &'static [PanelTab] {
        &[PanelTab::Analysis, PanelTab::Translation, PanelTab::Notes]
    }

    pub fn title(&self) -> &'static str {
        match self {
            PanelTab::Analysis => "Analysis",
            PanelTab::Translation => "Translation",
            PanelTab::Notes => "Notes",
        }
    }
}

/// Side panel showing details for the last clicked word.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WordPanel {
    word: Option<String>,
    tab: PanelTab,
    expanded: bool,
}

impl WordPanel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn word(&self) -> Option<&str> {
        self.word.as_deref()
    }

    pub fn tab(&self) -> PanelTab {
        self.tab
    }

    pub fn is_expanded(&self) -> bool {
        self.expanded
    }

    /// A new word always opens on the default tab, whatever tab the previous
    /// word was left on.
    pub fn select_word(&mut self, word: impl Into<String>) {
        self.word = Some(word.into());
        self.tab = PanelTab::default();
        self.expanded = true;
    }

    pub fn switch_tab(&mut self, tab: PanelTab) {
        self.tab = tab;
    }

    pub fn collapse(&mut self) {
        self.expanded = false;
    }
}
