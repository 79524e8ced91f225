//! Keyword tables and phrase patterns backing the emotion extractor.
//!
//! Matching is case-insensitive substring containment against the lowercased
//! feedback text; regexes are compiled once per [`Lexicon`] and shared by
//! every analysis call. No global state.

use regex::Regex;

use crate::profile::{DropoutEmotion, EmotionalTrigger, FrustrationType, RecoveryIndicator, UrgencyLevel, UrgencySignal};

pub const FRUSTRATION_CATEGORIES: &[(FrustrationType, &[&str])] = &[
    (
        FrustrationType::Technical,
        &["website", "platform", "error", "bug", "login", "system", "lms", "interface", "broken", "glitch", "crash"],
    ),
    (
        FrustrationType::Content,
        &["material", "content", "lecture", "understand", "concept", "difficult", "confusing", "unclear"],
    ),
    (
        FrustrationType::Support,
        &["help", "support", "response", "answer", "question", "ignored", "waiting", "unresponsive"],
    ),
    (
        FrustrationType::Pace,
        &["fast", "slow", "pace", "speed", "keep up", "behind", "rushed", "dragging"],
    ),
];

pub const GENERAL_FRUSTRATION: &[&str] = &[
    "frustrat", "difficult", "confused", "struggle", "hard", "annoying",
    "terrible", "awful", "horrible", "useless", "waste", "disappointed",
];

pub const STRONG_INTENSIFIERS: &[&str] = &["extremely", "very", "incredibly", "terribly", "absolutely"];

pub struct IndicatorSet {
    pub high: &'static [&'static str],
    pub medium: &'static [&'static str],
    pub low: &'static [&'static str],
}

pub const ENGAGEMENT_INDICATORS: IndicatorSet = IndicatorSet {
    high: &["excited", "interested", "engaged", "fascinating", "love", "enjoy", "captivating"],
    medium: &["good", "okay", "fine", "decent", "reasonable", "satisfactory"],
    low: &["boring", "dull", "uninteresting", "tedious", "monotonous", "disengaged"],
};

pub const CONFIDENCE_INDICATORS: IndicatorSet = IndicatorSet {
    high: &["confident", "sure", "certain", "understand", "grasp", "mastered", "clear"],
    medium: &["somewhat understand", "getting it", "making progress", "improving"],
    low: &["confused", "lost", "uncertain", "unclear", "don't understand", "struggling"],
};

pub const POSITIVE_SATISFACTION: &[&str] =
    &["satisfied", "happy", "pleased", "great", "excellent", "good", "helpful"];
pub const NEGATIVE_SATISFACTION: &[&str] =
    &["unsatisfied", "unhappy", "disappointed", "poor", "terrible", "bad", "unhelpful"];

/// Scanned in priority order; the first level with a matching phrase wins.
pub const URGENCY_PHRASES: &[(UrgencyLevel, &[&str])] = &[
    (
        UrgencyLevel::Immediate,
        &["immediately", "urgent", "asap", "right now", "can't wait", "emergency", "critical", "desperate"],
    ),
    (
        UrgencyLevel::Critical,
        &["very urgent", "need help now", "can't continue", "blocking me", "impossible", "giving up"],
    ),
    (
        UrgencyLevel::High,
        &["soon", "quickly", "need help", "struggling", "important", "priority", "stuck"],
    ),
    (
        UrgencyLevel::Medium,
        &["when possible", "would like", "appreciate", "should be addressed", "needs attention"],
    ),
    (
        UrgencyLevel::Low,
        &["eventually", "minor", "small issue", "not urgent", "whenever", "no rush"],
    ),
];

pub const HOT_EMOTION_WORDS: &[&str] = &[
    "angry", "furious", "excited", "thrilled", "frustrated", "enraged",
    "anxious", "stressed", "panicked", "desperate", "urgent", "passionate",
];

pub const COLD_EMOTION_WORDS: &[&str] = &[
    "calm", "detached", "indifferent", "bored", "tired", "exhausted",
    "apathetic", "disinterested", "resigned", "defeated", "numb",
];

pub const TEMPERATURE_INTENSIFIERS: &[&str] =
    &["very", "extremely", "incredibly", "absolutely", "completely", "totally"];

pub const POLITE_PHRASES: &[&str] = &[
    "thank you", "thanks for", "appreciate", "grateful",
    "please", "if possible", "if you could", "would be nice",
    "understand that", "i know that", "i realize",
];

pub const EMOTION_WORDS: &[&str] = &[
    "happy", "sad", "angry", "frustrated", "confused", "anxious", "excited",
    "bored", "interested", "confident", "worried", "overwhelmed", "satisfied",
    "disappointed", "hopeful", "discouraged", "grateful", "annoyed", "proud",
];

pub const POSITIVE_EMOTION_WORDS: &[&str] = &[
    "happy", "excited", "interested", "confident", "satisfied", "hopeful", "grateful", "proud",
];

pub const NEGATIVE_EMOTION_WORDS: &[&str] = &[
    "sad", "angry", "frustrated", "confused", "anxious", "bored", "worried",
    "overwhelmed", "disappointed", "discouraged", "annoyed",
];

pub const DROPOUT_PHRASES: &[(DropoutEmotion, &[&str])] = &[
    (DropoutEmotion::Helplessness, &["can't do this", "beyond me", "impossible for me", "no way i can"]),
    (DropoutEmotion::Overwhelm, &["too much", "overwhelming", "drowning in", "can't keep up", "too difficult"]),
    (DropoutEmotion::Isolation, &["all alone", "no one helps", "no support", "by myself", "no one responds"]),
    (DropoutEmotion::Despair, &["giving up", "no point", "useless to try", "hopeless", "waste of time"]),
    (DropoutEmotion::Anxiety, &["anxious", "worried", "stressed", "panic", "fear", "dread"]),
];

pub const RECOVERY_PHRASES: &[(RecoveryIndicator, &[&str])] = &[
    (RecoveryIndicator::Hope, &["hoping", "look forward to", "optimistic", "better next time"]),
    (RecoveryIndicator::Determination, &["determined", "will try again", "not giving up", "keep working"]),
    (RecoveryIndicator::Gratitude, &["thankful", "appreciate", "grateful", "thanks for"]),
    (RecoveryIndicator::Confidence, &["confident", "i can do this", "getting better at", "improving"]),
    (RecoveryIndicator::Enthusiasm, &["excited", "looking forward", "can't wait", "eager"]),
];

/// Compiled regex pattern groups; built once and owned by the analyzer.
pub struct Lexicon {
    pub explicit_frustration: Vec<Regex>,
    pub explicit_engagement_high: Regex,
    pub explicit_engagement_low: Regex,
    pub explicit_confidence_high: Regex,
    pub explicit_confidence_low: Regex,
    pub hedging_patterns: Vec<Regex>,
    pub praise_with_reservations: Vec<Regex>,
    pub faint_praise: Regex,
    pub diplomatic_language: Regex,
    pub urgency_signal_patterns: Vec<(UrgencySignal, Regex)>,
    pub excessive_gratitude: Regex,
    pub apology: Regex,
    pub authenticity_markers: Vec<Regex>,
    pub mixed_message_patterns: Vec<Regex>,
    pub mixed_feelings_patterns: Vec<Regex>,
    pub trigger_patterns: Vec<(EmotionalTrigger, Vec<Regex>)>,
}

// Patterns are literals; a failure to compile is a programming error, not
// an input condition.
fn re(pattern: &str) -> Regex {
    Regex::new(pattern).expect("static lexicon pattern compiles")
}

impl Default for Lexicon {
    fn default() -> Self {
        Self::new()
    }
}

impl Lexicon {
    pub fn new() -> Self {
        Self {
            explicit_frustration: vec![
                re(r"(i('m| am)|feeling) (very |really |extremely )?(frustrated|annoyed|upset)"),
                re(r"this is (very |really |extremely )?(frustrating|annoying|infuriating)"),
                re(r"(can't|cannot) (stand|handle|deal with) (this|it)( anymore)?"),
            ],
            explicit_engagement_high: re(r"i (really |absolutely )?(love|enjoy|like)"),
            explicit_engagement_low: re(r"i (really |absolutely )?(hate|dislike|can't stand)"),
            explicit_confidence_high: re(r"i('m| am) (very |really |extremely )?(confident|sure|certain)"),
            explicit_confidence_low: re(r"i('m| am) (very |really |extremely )?(confused|lost|unsure)"),
            hedging_patterns: vec![
                re(r"(it's|its|is|was) (fine|okay|alright)( i guess| i suppose)?"),
                re(r"not (too|that) bad"),
                re(r"could be (better|worse)"),
                re(r"i (suppose|guess) it('s| is) (okay|fine|alright)"),
                re(r"(works|functions) (well enough|adequately)"),
                re(r"(somewhat|kind of|sort of) (helpful|useful)"),
                re(r"(better than|not as bad as) (expected|anticipated)"),
                re(r"(can't complain|no complaints)( too much| much)?"),
                re(r"(doing|trying) (my|their) best"),
                re(r"(probably|maybe) just me"),
            ],
            praise_with_reservations: vec![
                re(r"(good|great|nice) but"),
                re(r"(like|enjoy).*(however|though|but)"),
            ],
            faint_praise: re(r"(somewhat|kind of|sort of) (good|helpful|useful)"),
            diplomatic_language: re(r"(i appreciate|thank you for) (the effort|trying|attempting)"),
            urgency_signal_patterns: vec![
                (
                    UrgencySignal::ConsideringDropping,
                    re(r"(thinking|considering) (of )?(dropping|quitting|leaving)"),
                ),
                (
                    UrgencySignal::MissedDeadlines,
                    re(r"(missed|missing|late|behind on) (deadline|assignment|submission|work)"),
                ),
                (UrgencySignal::HelpRequests, re(r"(need|asking for|requesting) help")),
                (
                    UrgencySignal::ProgressBlocked,
                    re(r"(can't|cannot|unable to) (continue|proceed|move forward|progress)"),
                ),
                (
                    UrgencySignal::TimelinePressure,
                    re(r"(deadline|due date) (approaching|coming up|soon)"),
                ),
                (
                    UrgencySignal::RepeatedAttempts,
                    re(r"(tried|attempted) (multiple times|several times|many times)"),
                ),
            ],
            excessive_gratitude: re(r"(very|really|truly|so) (grateful|thankful|appreciative)"),
            apology: re(r"(sorry to|apologize for) (bother|trouble|disturb)"),
            authenticity_markers: vec![
                re(r"honestly"),
                re(r"to be honest"),
                re(r"frankly"),
                re(r"to tell the truth"),
                re(r"i (really|truly) (feel|think|believe)"),
                re(r"i'm not going to lie"),
            ],
            mixed_message_patterns: vec![
                re(r"(good|great|excellent).*(but|however|though)"),
                re(r"(like|enjoy).*(but|however|though)"),
                re(r"(not complaining|don't want to complain).*(but|however|though)"),
            ],
            mixed_feelings_patterns: vec![
                re(r"mixed feelings"),
                re(r"conflicted"),
                re(r"torn"),
                re(r"on one hand.*on the other"),
                re(r"part of me.*another part"),
                re(r"both happy and"),
                re(r"both frustrated and"),
            ],
            trigger_patterns: vec![
                (
                    EmotionalTrigger::DeadlinePressure,
                    vec![re(r"deadline"), re(r"due date"), re(r"running out of time"), re(r"not enough time")],
                ),
                (
                    EmotionalTrigger::TechnicalIssues,
                    vec![
                        re(r"(website|system|platform) (doesn't work|isn't working|broken|keeps crashing)"),
                        re(r"technical (issue|problem|error)"),
                    ],
                ),
                (
                    EmotionalTrigger::ContentDifficulty,
                    vec![re(r"(too|very) (difficult|hard|complex)"), re(r"don't understand"), re(r"confused by")],
                ),
                (
                    EmotionalTrigger::LackOfSupport,
                    vec![
                        re(r"no (help|support|response)"),
                        re(r"no one (answers|responds)"),
                        re(r"waiting for (help|a response|response)"),
                    ],
                ),
                (
                    EmotionalTrigger::PeerComparison,
                    vec![re(r"everyone else (gets it|understands)"), re(r"falling behind"), re(r"only one struggling")],
                ),
                (
                    EmotionalTrigger::FeedbackIssues,
                    vec![re(r"(no|unclear|unhelpful) feedback"), re(r"don't know (how|what) i'm doing wrong")],
                ),
                (
                    EmotionalTrigger::WorkloadIssues,
                    vec![
                        re(r"too (much|many) (assignments|tasks|work)"),
                        re(r"workload is (overwhelming|too much)"),
                    ],
                ),
                (
                    EmotionalTrigger::InstructorIssues,
                    vec![re(r"instructor (doesn't|isn't) (explain|clear|helpful)"), re(r"teaching style")],
                ),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urgency_phrases_are_priority_ordered() {
        let order: Vec<UrgencyLevel> = URGENCY_PHRASES.iter().map(|(level, _)| *level).collect();
        assert_eq!(
            order,
            vec![
                UrgencyLevel::Immediate,
                UrgencyLevel::Critical,
                UrgencyLevel::High,
                UrgencyLevel::Medium,
                UrgencyLevel::Low,
            ]
        );
    }

    #[test]
    fn lexicon_compiles_all_patterns() {
        let lexicon = Lexicon::new();
        assert_eq!(lexicon.hedging_patterns.len(), 10);
        assert_eq!(lexicon.urgency_signal_patterns.len(), 6);
        assert_eq!(lexicon.trigger_patterns.len(), 8);
    }

    #[test]
    fn hedging_matches_common_phrasings() {
        let lexicon = Lexicon::new();
        let hits = |text: &str| {
            lexicon
                .hedging_patterns
                .iter()
                .filter(|p| p.is_match(text))
                .count()
        };
        assert!(hits("the course is fine i guess") >= 1);
        assert!(hits("somewhat helpful overall") >= 1);
        assert!(hits("probably just me") >= 1);
        assert_eq!(hits("this course is excellent and i love it"), 0);
    }
}
