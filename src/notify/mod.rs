use leptos::prelude::*;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum NoticeKind {
    Success,
    Info,
    Warning,
    Danger,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Toast {
    pub id: u64,
    pub kind: NoticeKind,
    pub message: String,
}

/// How long a toast stays on screen before the view dismisses it.
pub(crate) const TOAST_TTL_MS: i32 = 4000;

/// Toast queue shared by every controller.
#[derive(Clone, Copy)]
pub(crate) struct Notifications {
    toasts: RwSignal<Vec<Toast>>,
    next_id: RwSignal<u64>,
}

impl Notifications {
    pub fn new() -> Self {
        Self {
            toasts: RwSignal::new(vec![]),
            next_id: RwSignal::new(1),
        }
    }

    pub fn add(&self, kind: NoticeKind, message: impl Into<String>) -> u64 {
        let id = self.next_id.get_untracked();
        self.next_id.set(id + 1);
        let toast = Toast {
            id,
            kind,
            message: message.into(),
        };
        self.toasts.update(|t| t.push(toast));
        id
    }

    pub fn success(&self, message: impl Into<String>) -> u64 {
        self.add(NoticeKind::Success, message)
    }

    pub fn info(&self, message: impl Into<String>) -> u64 {
        self.add(NoticeKind::Info, message)
    }

    pub fn warning(&self, message: impl Into<String>) -> u64 {
        self.add(NoticeKind::Warning, message)
    }

    pub fn danger(&self, message: impl Into<String>) -> u64 {
        self.add(NoticeKind::Danger, message)
    }

    pub fn dismiss(&self, id: u64) {
        self.toasts.update(|t| t.retain(|x| x.id != id));
    }

    /// Reactive read for the toast stack view.
    pub fn list(&self) -> Vec<Toast> {
        self.toasts.get()
    }

    #[cfg(test)]
    pub fn snapshot(&self) -> Vec<Toast> {
        self.toasts.get_untracked()
    }
}

impl Default for Notifications {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_dismiss() {
        let n = Notifications::new();
        let a = n.success("Saved");
        let b = n.danger("Failed");
        assert_ne!(a, b);
        assert_eq!(n.snapshot().len(), 2);

        n.dismiss(a);
        let left = n.snapshot();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].kind, NoticeKind::Danger);
        assert_eq!(left[0].message, "Failed");
    }
}
