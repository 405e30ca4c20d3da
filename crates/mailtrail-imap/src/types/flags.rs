//! Message flags and flag-delta tracking.

/// Message flags.
///
/// Keywords compare ASCII case-insensitively, as IMAP treats `$Junk` and
/// `$junk` as the same flag. The spelling first seen is kept.
#[derive(Debug, Clone)]
pub enum Flag {
    /// Message has been read.
    Seen,
    /// Message has been answered.
    Answered,
    /// Message is flagged for special attention.
    Flagged,
    /// Message is marked for deletion.
    Deleted,
    /// Message is a draft.
    Draft,
    /// Message is recent (first session to see it).
    Recent,
    /// `\*` in PERMANENTFLAGS: new keywords may be created.
    MayCreate,
    /// Custom keyword flag.
    Keyword(String),
}

impl Flag {
    /// Parses a flag string.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_ascii_uppercase().as_str() {
            "\\SEEN" => Self::Seen,
            "\\ANSWERED" => Self::Answered,
            "\\FLAGGED" => Self::Flagged,
            "\\DELETED" => Self::Deleted,
            "\\DRAFT" => Self::Draft,
            "\\RECENT" => Self::Recent,
            "\\*" => Self::MayCreate,
            _ => Self::Keyword(s.to_string()),
        }
    }

    /// Returns the flag as an IMAP string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Seen => "\\Seen",
            Self::Answered => "\\Answered",
            Self::Flagged => "\\Flagged",
            Self::Deleted => "\\Deleted",
            Self::Draft => "\\Draft",
            Self::Recent => "\\Recent",
            Self::MayCreate => "\\*",
            Self::Keyword(s) => s,
        }
    }
}

impl PartialEq for Flag {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Keyword(a), Self::Keyword(b)) => a.eq_ignore_ascii_case(b),
            _ => std::mem::discriminant(self) == std::mem::discriminant(other),
        }
    }
}

impl Eq for Flag {}

impl std::hash::Hash for Flag {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        if let Self::Keyword(k) = self {
            for b in k.bytes() {
                state.write_u8(b.to_ascii_lowercase());
            }
        }
    }
}

impl std::fmt::Display for Flag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Collection of message flags in insertion order, without duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Flags {
    flags: Vec<Flag>,
}

impl Flags {
    /// Creates an empty flags collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a flag.
    pub fn insert(&mut self, flag: Flag) {
        if !self.flags.contains(&flag) {
            self.flags.push(flag);
        }
    }

    /// Removes a flag.
    pub fn remove(&mut self, flag: &Flag) {
        self.flags.retain(|f| f != flag);
    }

    /// Returns true if the flag is present.
    #[must_use]
    pub fn contains(&self, flag: &Flag) -> bool {
        self.flags.contains(flag)
    }

    /// Returns true if the message has been seen.
    #[must_use]
    pub fn is_seen(&self) -> bool {
        self.contains(&Flag::Seen)
    }

    /// Returns true if the message is marked for deletion.
    #[must_use]
    pub fn is_deleted(&self) -> bool {
        self.contains(&Flag::Deleted)
    }

    /// Flags in `self` that are not in `other`.
    #[must_use]
    pub fn difference(&self, other: &Self) -> Self {
        self.flags
            .iter()
            .filter(|f| !other.contains(f))
            .cloned()
            .collect()
    }

    /// Returns an iterator over the flags.
    pub fn iter(&self) -> impl Iterator<Item = &Flag> {
        self.flags.iter()
    }

    /// Returns the flags as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[Flag] {
        &self.flags
    }

    /// Returns the number of flags.
    #[must_use]
    pub fn len(&self) -> usize {
        self.flags.len()
    }

    /// Returns true if there are no flags.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    /// Compares as sets, ignoring order.
    #[must_use]
    pub fn same_set(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().all(|f| other.contains(f))
    }
}

impl FromIterator<Flag> for Flags {
    fn from_iter<I: IntoIterator<Item = Flag>>(iter: I) -> Self {
        let mut flags = Self::new();
        for flag in iter {
            flags.insert(flag);
        }
        flags
    }
}

impl IntoIterator for Flags {
    type Item = Flag;
    type IntoIter = std::vec::IntoIter<Flag>;

    fn into_iter(self) -> Self::IntoIter {
        self.flags.into_iter()
    }
}

impl<'a> IntoIterator for &'a Flags {
    type Item = &'a Flag;
    type IntoIter = std::slice::Iter<'a, Flag>;

    fn into_iter(self) -> Self::IntoIter {
        self.flags.iter()
    }
}

/// Current flags of a message plus an optional saved baseline.
///
/// After [`checkpoint`](Self::checkpoint), local edits accumulate in the
/// current set and [`added`](Self::added) / [`removed`](Self::removed)
/// give the minimal `+FLAGS` / `-FLAGS` update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlagSnapshot {
    current: Flags,
    baseline: Option<Flags>,
}

impl FlagSnapshot {
    /// Creates a snapshot with the given current flags and no baseline.
    #[must_use]
    pub fn new(current: Flags) -> Self {
        Self {
            current,
            baseline: None,
        }
    }

    /// Saves the current flags as the baseline.
    pub fn checkpoint(&mut self) {
        self.baseline = Some(self.current.clone());
    }

    /// Returns the saved baseline, if any.
    #[must_use]
    pub const fn baseline(&self) -> Option<&Flags> {
        self.baseline.as_ref()
    }

    /// Returns the current flags.
    #[must_use]
    pub const fn current(&self) -> &Flags {
        &self.current
    }

    /// Returns the current flags for editing.
    pub fn current_mut(&mut self) -> &mut Flags {
        &mut self.current
    }

    /// Adds a flag to the current set.
    pub fn set(&mut self, flag: Flag) {
        self.current.insert(flag);
    }

    /// Removes a flag from the current set.
    pub fn clear(&mut self, flag: &Flag) {
        self.current.remove(flag);
    }

    /// Flags in the current set but not in the baseline.
    ///
    /// Without a baseline every current flag counts as added.
    #[must_use]
    pub fn added(&self) -> Flags {
        match &self.baseline {
            Some(base) => self.current.difference(base),
            None => self.current.clone(),
        }
    }

    /// Flags in the baseline but not in the current set.
    #[must_use]
    pub fn removed(&self) -> Flags {
        self.baseline
            .as_ref()
            .map_or_else(Flags::new, |base| base.difference(&self.current))
    }

    /// Returns true if the current set differs from the baseline.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        !self.added().is_empty() || !self.removed().is_empty()
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;

    mod flag_tests {
        use super::*;

        #[test]
        fn parse_system_flags() {
            assert_eq!(Flag::parse("\\Seen"), Flag::Seen);
            assert_eq!(Flag::parse("\\SEEN"), Flag::Seen);
            assert_eq!(Flag::parse("\\deleted"), Flag::Deleted);
            assert_eq!(Flag::parse("\\*"), Flag::MayCreate);
        }

        #[test]
        fn parse_keyword() {
            let flag = Flag::parse("$Important");
            assert_eq!(flag, Flag::Keyword("$Important".to_string()));
            assert_eq!(flag.as_str(), "$Important");
        }

        #[test]
        fn keywords_ignore_case() {
            assert_eq!(Flag::parse("$Junk"), Flag::parse("$junk"));
            assert_ne!(Flag::parse("$Junk"), Flag::parse("$NotJunk"));
            assert_ne!(Flag::Keyword("Seen".to_string()), Flag::Seen);

            let set: std::collections::HashSet<Flag> =
                [Flag::parse("$Junk"), Flag::parse("$JUNK")].into_iter().collect();
            assert_eq!(set.len(), 1);
        }

        #[test]
        fn display() {
            assert_eq!(format!("{}", Flag::Answered), "\\Answered");
            assert_eq!(format!("{}", Flag::MayCreate), "\\*");
        }
    }

    mod flags_tests {
        use super::*;

        #[test]
        fn insert_unique() {
            let mut flags = Flags::new();
            flags.insert(Flag::Seen);
            flags.insert(Flag::Seen);
            assert_eq!(flags.len(), 1);
        }

        #[test]
        fn difference() {
            let a: Flags = [Flag::Seen, Flag::Draft].into_iter().collect();
            let b: Flags = [Flag::Draft].into_iter().collect();
            assert_eq!(a.difference(&b).as_slice(), &[Flag::Seen]);
            assert!(b.difference(&a).is_empty());
        }

        #[test]
        fn same_set_ignores_order() {
            let a: Flags = [Flag::Seen, Flag::Draft].into_iter().collect();
            let b: Flags = [Flag::Draft, Flag::Seen].into_iter().collect();
            assert!(a.same_set(&b));
            assert_ne!(a, b);
        }
    }

    mod snapshot_tests {
        use proptest::prelude::*;

        use super::*;

        #[test]
        fn no_baseline_means_everything_added() {
            let snap = FlagSnapshot::new([Flag::Seen].into_iter().collect());
            assert_eq!(snap.added().as_slice(), &[Flag::Seen]);
            assert!(snap.removed().is_empty());
        }

        #[test]
        fn delta_after_checkpoint() {
            let mut snap = FlagSnapshot::new([Flag::Seen, Flag::Flagged].into_iter().collect());
            snap.checkpoint();
            assert!(!snap.is_dirty());

            snap.clear(&Flag::Flagged);
            snap.set(Flag::Deleted);

            assert_eq!(snap.added().as_slice(), &[Flag::Deleted]);
            assert_eq!(snap.removed().as_slice(), &[Flag::Flagged]);
            assert!(snap.is_dirty());
        }

        #[test]
        fn keyword_case_change_is_not_a_delta() {
            let mut snap = FlagSnapshot::new([Flag::parse("$Junk")].into_iter().collect());
            snap.checkpoint();
            *snap.current_mut() = [Flag::parse("$junk")].into_iter().collect();

            assert!(snap.added().is_empty());
            assert!(snap.removed().is_empty());
            assert!(!snap.is_dirty());
        }

        fn flag_strategy() -> impl Strategy<Value = Flag> {
            prop_oneof![
                Just(Flag::Seen),
                Just(Flag::Answered),
                Just(Flag::Flagged),
                Just(Flag::Deleted),
                Just(Flag::Draft),
                "[a-z]{1,4}".prop_map(Flag::Keyword),
            ]
        }

        proptest! {
            #[test]
            fn applying_delta_to_baseline_yields_current(
                a in proptest::collection::vec(flag_strategy(), 0..8),
                b in proptest::collection::vec(flag_strategy(), 0..8),
            ) {
                let base: Flags = a.into_iter().collect();
                let target: Flags = b.into_iter().collect();

                let mut snap = FlagSnapshot::new(base.clone());
                snap.checkpoint();
                *snap.current_mut() = target.clone();

                let added = snap.added();
                let removed = snap.removed();
                prop_assert!(added.same_set(&target.difference(&base)));
                prop_assert!(removed.same_set(&base.difference(&target)));

                let mut applied = base;
                for f in removed {
                    applied.remove(&f);
                }
                for f in added {
                    applied.insert(f);
                }
                prop_assert!(applied.same_set(&target));
            }
        }
    }
}
