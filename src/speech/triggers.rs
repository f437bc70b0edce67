// Phrase triggers for narration sound effects
//
// Matching is done once per utterance against the full text. A trigger's
// firing point is the end of the first occurrence of its phrase that does not
// sit inside its excluding superstring. As boundaries arrive the consumed
// prefix only grows, so each trigger fires at most once per pass.

use serde::{Deserialize, Serialize};

/// A phrase that plays an effect once narration has spoken it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trigger {
    pub phrase: String,
    pub effect: String,
    /// Occurrences of `phrase` inside this longer phrase do not count
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unless: Option<String>,
}

impl Trigger {
    pub fn new(phrase: impl Into<String>, effect: impl Into<String>) -> Self {
        Self {
            phrase: phrase.into(),
            effect: effect.into(),
            unless: None,
        }
    }

    pub fn unless(mut self, superstring: impl Into<String>) -> Self {
        self.unless = Some(superstring.into());
        self
    }

    /// Byte offset (in `lowered`) where the first genuine occurrence ends
    fn firing_offset(&self, lowered: &str) -> Option<usize> {
        let phrase = self.phrase.to_lowercase();
        if phrase.is_empty() {
            return None;
        }
        let masks: Vec<(usize, usize)> = match &self.unless {
            Some(unless) if !unless.is_empty() => {
                let unless = unless.to_lowercase();
                lowered
                    .match_indices(unless.as_str())
                    .map(|(at, m)| (at, at + m.len()))
                    .collect()
            }
            _ => Vec::new(),
        };

        lowered
            .match_indices(phrase.as_str())
            .map(|(at, m)| (at, at + m.len()))
            .find(|&(start, end)| !masks.iter().any(|&(ms, me)| ms <= start && end <= me))
            .map(|(_, end)| end)
    }
}

struct Armed {
    effect: String,
    fire_at: Option<usize>,
    fired: bool,
}

/// Triggers armed against one utterance's text
pub struct TriggerSet {
    triggers: Vec<Trigger>,
    /// Lowercased start offset of every UTF-16 code unit of the original text
    unit_offsets: Vec<usize>,
    armed: Vec<Armed>,
}

impl TriggerSet {
    pub fn new(triggers: Vec<Trigger>) -> Self {
        Self {
            triggers,
            unit_offsets: vec![0],
            armed: Vec::new(),
        }
    }

    /// Prepare for a new narration of `text`, clearing every fired flag
    pub fn arm(&mut self, text: &str) {
        let mut lowered = String::with_capacity(text.len());
        let mut unit_offsets = Vec::with_capacity(text.len() + 1);
        for c in text.chars() {
            let start = lowered.len();
            for _ in 0..c.len_utf16() {
                unit_offsets.push(start);
            }
            lowered.extend(c.to_lowercase());
        }
        unit_offsets.push(lowered.len());

        self.armed = self
            .triggers
            .iter()
            .map(|t| Armed {
                effect: t.effect.clone(),
                fire_at: t.firing_offset(&lowered),
                fired: false,
            })
            .collect();
        self.unit_offsets = unit_offsets;
    }

    /// Effects due now that `consumed` UTF-16 units have been narrated
    pub fn advance(&mut self, consumed: usize) -> Vec<String> {
        let last = self.unit_offsets.len() - 1;
        let consumed = self.unit_offsets[consumed.min(last)];

        let mut due = Vec::new();
        for armed in self.armed.iter_mut().filter(|a| !a.fired) {
            if armed.fire_at.is_some_and(|at| at <= consumed) {
                armed.fired = true;
                due.push(armed.effect.clone());
            }
        }
        due
    }
}
