//! Overlay kinds the editor knows how to instantiate.

use std::fmt;

/// The fixed set of overlay kinds a palette entry may offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OverlayKind {
    SingleAnswerQuiz,
    MultiAnswerQuiz,
    ShortAnswerQuiz,
    MathQuiz,
    HotspotQuiz,
    DrawQuiz,
    CustomQuiz,
    StandardAnnotation,
    ShortAnnotation,
}

impl OverlayKind {
    /// Every kind, in palette order.
    pub const ALL: [OverlayKind; 9] = [
        OverlayKind::SingleAnswerQuiz,
        OverlayKind::MultiAnswerQuiz,
        OverlayKind::ShortAnswerQuiz,
        OverlayKind::MathQuiz,
        OverlayKind::HotspotQuiz,
        OverlayKind::DrawQuiz,
        OverlayKind::CustomQuiz,
        OverlayKind::StandardAnnotation,
        OverlayKind::ShortAnnotation,
    ];

    /// Element name used as the `type` discriminator on the wire.
    pub fn id(self) -> &'static str {
        match self {
            OverlayKind::SingleAnswerQuiz => "socrates-single-answer-quiz",
            OverlayKind::MultiAnswerQuiz => "socrates-multi-answer-quiz",
            OverlayKind::ShortAnswerQuiz => "socrates-short-answer-quiz-editor",
            OverlayKind::MathQuiz => "socrates-math-quiz",
            OverlayKind::HotspotQuiz => "socrates-hotspot-quiz",
            OverlayKind::DrawQuiz => "socrates-draw-quiz",
            OverlayKind::CustomQuiz => "socrates-custom-quiz",
            OverlayKind::StandardAnnotation => "socrates-standard-annotation",
            OverlayKind::ShortAnnotation => "socrates-short-annotation",
        }
    }

    /// Look up a kind by its wire id.
    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.id() == id)
    }

    /// Whether this kind is a quiz (as opposed to an annotation).
    pub fn is_quiz(self) -> bool {
        !matches!(
            self,
            OverlayKind::StandardAnnotation | OverlayKind::ShortAnnotation
        )
    }
}

impl fmt::Display for OverlayKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique_and_resolve_back() {
        for kind in OverlayKind::ALL {
            assert_eq!(OverlayKind::from_id(kind.id()), Some(kind));
        }

        let mut ids: Vec<_> = OverlayKind::ALL.iter().map(|k| k.id()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), OverlayKind::ALL.len());
    }

    #[test]
    fn rejects_unknown_ids() {
        assert_eq!(OverlayKind::from_id("socrates-switch-annotation"), None);
        assert_eq!(OverlayKind::from_id(""), None);
    }

    #[test]
    fn separates_quizzes_from_annotations() {
        assert!(OverlayKind::HotspotQuiz.is_quiz());
        assert!(!OverlayKind::ShortAnnotation.is_quiz());
    }
}
