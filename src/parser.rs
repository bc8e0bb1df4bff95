use crate::bank::{Choice, Question, QuestionKind, QuestionSet};
use crate::error::{QuizcutError, Result};
use crate::timeline::Timeline;
use once_cell::sync::Lazy;
use regex::Regex;

static VIDEO_CUE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^video:(.*)$").expect("invalid VIDEO_CUE regex"));

static DIRECTIVE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^@([A-Za-z_][A-Za-z0-9_-]*)\s*=\s*(.*)$").expect("invalid DIRECTIVE regex")
});

static QUESTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+)\.(.*)$").expect("invalid QUESTION regex"));

static CHOICE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:\[(.*)\]|\((.*)\))$").expect("invalid CHOICE regex"));

/// Grammar knobs for the question bank
#[derive(Debug, Clone)]
pub struct ParserSettings {
    /// Seconds per unit of a `@gap=` value
    pub gap_unit: f64,
    /// Character right inside a choice bracket marking it correct
    pub correct_marker: char,
}

impl Default for ParserSettings {
    fn default() -> Self {
        Self {
            gap_unit: 1.0,
            correct_marker: '*',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    ScanningForCue,
    InSection,
    InChoices,
}

/// Whether a handler used the line or handed it back for the next state
enum Flow {
    Consumed,
    Reprocess,
}

struct Line<'s> {
    number: usize,
    text: &'s str,
}

/// Pre-split lines with a single slot of pushback
struct LineCursor<'s> {
    lines: Vec<&'s str>,
    pos: usize,
    unread: bool,
}

impl<'s> LineCursor<'s> {
    fn new(text: &'s str) -> Self {
        Self {
            lines: text.strip_prefix('\u{feff}').unwrap_or(text).lines().collect(),
            pos: 0,
            unread: false,
        }
    }

    fn next(&mut self) -> Option<Line<'s>> {
        let text = self.lines.get(self.pos)?.trim();
        self.pos += 1;
        self.unread = false;
        Some(Line {
            number: self.pos,
            text,
        })
    }

    /// Make the next `next()` return the line just read
    fn unread(&mut self) {
        debug_assert!(!self.unread && self.pos > 0, "only one line of pushback");
        if !self.unread && self.pos > 0 {
            self.pos -= 1;
            self.unread = true;
        }
    }
}

struct DraftQuestion {
    title: String,
    line: usize,
    choices: Vec<Choice>,
    gap: Option<f64>,
}

struct PendingGap {
    seconds: f64,
    line: usize,
}

/// Line-oriented reader turning a question bank into per-cue question sets
pub struct QuestionBankParser<'t, 'a> {
    timeline: &'t mut Timeline<'a>,
    settings: ParserSettings,
    state: State,
    sets: Vec<QuestionSet>,
    current: Option<QuestionSet>,
    draft: Option<DraftQuestion>,
    pending_gap: Option<PendingGap>,
}

impl<'t, 'a> QuestionBankParser<'t, 'a> {
    pub fn new(timeline: &'t mut Timeline<'a>, settings: ParserSettings) -> Self {
        Self {
            timeline,
            settings,
            state: State::ScanningForCue,
            sets: Vec::new(),
            current: None,
            draft: None,
            pending_gap: None,
        }
    }

    /// Parse the whole bank, advancing the timeline on every cue
    pub fn parse(mut self, text: &str) -> Result<Vec<QuestionSet>> {
        let mut lines = LineCursor::new(text);

        while let Some(line) = lines.next() {
            let flow = match self.state {
                State::ScanningForCue => self.scan(&line)?,
                State::InSection => self.section(&line)?,
                State::InChoices => self.choices(&line)?,
            };
            if let Flow::Reprocess = flow {
                lines.unread();
            }
        }

        if self.state == State::InChoices {
            self.finish_question()?;
        }
        self.close_set();

        Ok(self.sets)
    }

    fn scan(&mut self, line: &Line) -> Result<Flow> {
        if let Some(cue) = cue_of(line)? {
            let start = self.timeline.advance(cue)?;
            log::debug!("line {}: cue '{}' opens at {:.3}s", line.number, cue, start);
            self.current = Some(QuestionSet::new(cue, start));
            self.state = State::InSection;
        } else if QUESTION.is_match(line.text) {
            log::warn!(
                "line {}: question before any video cue ignored: '{}'",
                line.number,
                line.text
            );
        }
        Ok(Flow::Consumed)
    }

    fn section(&mut self, line: &Line) -> Result<Flow> {
        if VIDEO_CUE.is_match(line.text) {
            self.close_set();
            self.state = State::ScanningForCue;
            return Ok(Flow::Reprocess);
        }

        if let Some(caps) = DIRECTIVE.captures(line.text) {
            let key = caps.get(1).map_or("", |m| m.as_str());
            let value = caps.get(2).map_or("", |m| m.as_str());
            self.directive(line, key, value)?;
            return Ok(Flow::Consumed);
        }

        if let Some(caps) = QUESTION.captures(line.text) {
            let title = caps.get(2).map_or("", |m| m.as_str()).trim();
            if title.is_empty() {
                return Err(QuizcutError::format(
                    line.number,
                    format!("question '{}' has no title", line.text),
                ));
            }
            self.draft = Some(DraftQuestion {
                title: title.to_string(),
                line: line.number,
                choices: Vec::new(),
                gap: self.pending_gap.take().map(|g| g.seconds),
            });
            self.state = State::InChoices;
        }

        Ok(Flow::Consumed)
    }

    fn choices(&mut self, line: &Line) -> Result<Flow> {
        if let Some(choice) = self.choice_of(line)? {
            if let Some(draft) = self.draft.as_mut() {
                draft.choices.push(choice);
            }
            return Ok(Flow::Consumed);
        }

        // Directives inside a choice run are held for the next question
        if let Some(caps) = DIRECTIVE.captures(line.text) {
            let key = caps.get(1).map_or("", |m| m.as_str());
            let value = caps.get(2).map_or("", |m| m.as_str());
            self.directive(line, key, value)?;
            return Ok(Flow::Consumed);
        }

        if VIDEO_CUE.is_match(line.text) || QUESTION.is_match(line.text) {
            self.finish_question()?;
            self.state = State::InSection;
            return Ok(Flow::Reprocess);
        }

        Ok(Flow::Consumed)
    }

    fn directive(&mut self, line: &Line, key: &str, value: &str) -> Result<()> {
        if key != "gap" {
            log::warn!("line {}: unknown directive '@{}' ignored", line.number, key);
            return Ok(());
        }

        let seconds = value
            .trim()
            .parse::<f64>()
            .ok()
            .map(|g| g * self.settings.gap_unit)
            .filter(|s| s.is_finite() && *s >= 0.0)
            .ok_or_else(|| {
                QuizcutError::format(line.number, format!("invalid gap value in '{}'", line.text))
            })?;

        if let Some(previous) = &self.pending_gap {
            log::warn!(
                "line {}: gap directive overrides the one on line {}",
                line.number,
                previous.line
            );
        }
        self.pending_gap = Some(PendingGap {
            seconds,
            line: line.number,
        });
        Ok(())
    }

    fn choice_of(&self, line: &Line) -> Result<Option<Choice>> {
        let Some(caps) = CHOICE.captures(line.text) else {
            return Ok(None);
        };
        let inner = caps
            .get(1)
            .or_else(|| caps.get(2))
            .map_or("", |m| m.as_str())
            .trim_start();

        let (correct, label) = match inner.strip_prefix(self.settings.correct_marker) {
            Some(rest) => (true, rest),
            None => (false, inner),
        };
        let label = label.trim();
        if label.is_empty() {
            return Err(QuizcutError::format(
                line.number,
                format!("choice '{}' has no label", line.text),
            ));
        }

        Ok(Some(Choice::new(label, correct)))
    }

    fn finish_question(&mut self) -> Result<()> {
        let Some(draft) = self.draft.take() else {
            return Ok(());
        };

        let kind = QuestionKind::resolve(draft.choices).ok_or_else(|| {
            QuizcutError::format(
                draft.line,
                format!("question '{}' has no correct choice", draft.title),
            )
        })?;
        log::debug!(
            "line {}: question '{}' finalized as {}",
            draft.line,
            draft.title,
            kind.label()
        );

        if let Some(set) = self.current.as_mut() {
            set.questions.push(Question {
                title: draft.title,
                kind,
                gap: draft.gap,
            });
        }
        Ok(())
    }

    fn close_set(&mut self) {
        if let Some(set) = self.current.take() {
            if let Some(gap) = self.pending_gap.take() {
                log::warn!(
                    "line {}: gap directive not followed by a question in '{}', dropped",
                    gap.line,
                    set.video
                );
            }
            self.sets.push(set);
        }
    }
}

fn cue_of<'s>(line: &Line<'s>) -> Result<Option<&'s str>> {
    let Some(caps) = VIDEO_CUE.captures(line.text) else {
        return Ok(None);
    };
    let cue = caps.get(1).map_or("", |m| m.as_str()).trim();
    if cue.is_empty() {
        return Err(QuizcutError::format(
            line.number,
            "video cue has no segment identifier",
        ));
    }
    Ok(Some(cue))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bank::VideoSegment;
    use crate::timeline::CuePolicy;

    fn segments() -> Vec<VideoSegment> {
        vec![
            VideoSegment::new("a.mp4", 10.0),
            VideoSegment::new("b.mp4", 5.0),
        ]
    }

    fn parse(text: &str) -> Result<Vec<QuestionSet>> {
        let segments = segments();
        let mut timeline = Timeline::new(&segments, CuePolicy::Strict);
        QuestionBankParser::new(&mut timeline, ParserSettings::default()).parse(text)
    }

    #[test]
    fn test_parse_two_cues() {
        let text = "\
video: a.mp4
1. Which letter?
[x]
[* y]
video: b.mp4
1. Which letters?
[* p]
[* q]
";
        let sets = parse(text).unwrap();
        assert_eq!(sets.len(), 2);

        assert_eq!(sets[0].video, "a.mp4");
        assert_eq!(sets[0].start_time, 10.0);
        assert_eq!(sets[0].questions.len(), 1);
        assert_eq!(sets[0].questions[0].title, "Which letter?");
        assert_eq!(
            sets[0].questions[0].kind,
            QuestionKind::SingleChoice(vec![Choice::new("x", false), Choice::new("y", true)])
        );

        assert_eq!(sets[1].start_time, 15.0);
        assert!(matches!(
            sets[1].questions[0].kind,
            QuestionKind::MultipleChoice(_)
        ));
    }

    #[test]
    fn test_question_boundaries_use_pushback() {
        let text = "\
video: a.mp4
1. First
(* one)
(two)
2. Second
[* three]
3. Third
[four]
[* five]
";
        let sets = parse(text).unwrap();
        let titles: Vec<_> = sets[0].questions.iter().map(|q| q.title.as_str()).collect();
        assert_eq!(titles, vec!["First", "Second", "Third"]);
        assert_eq!(sets[0].questions[1].kind.choices().len(), 1);
        assert_eq!(sets[0].questions[2].kind.choices()[1], Choice::new("five", true));
    }

    #[test]
    fn test_ignores_comments_and_blank_lines() {
        let text = "
# intro notes
  video: a.mp4

some narration here
  1.   Padded title
   [* yes ]
   not a choice
   [no]
";
        let sets = parse(text).unwrap();
        let question = &sets[0].questions[0];
        assert_eq!(question.title, "Padded title");
        assert_eq!(
            question.kind.choices(),
            &[Choice::new("yes", true), Choice::new("no", false)]
        );
    }

    #[test]
    fn test_gap_directive_applies_to_next_question() {
        let text = "\
video: a.mp4
1. Default width
[* a]
@gap=3
2. Wide
[* b]
3. Default again
[* c]
";
        let sets = parse(text).unwrap();
        let gaps: Vec<_> = sets[0].questions.iter().map(|q| q.gap).collect();
        assert_eq!(gaps, vec![None, Some(3.0), None]);
    }

    #[test]
    fn test_gap_unit_scales_directive() {
        let segments = segments();
        let mut timeline = Timeline::new(&segments, CuePolicy::Strict);
        let settings = ParserSettings {
            gap_unit: 0.5,
            ..ParserSettings::default()
        };
        let sets = QuestionBankParser::new(&mut timeline, settings)
            .parse("video: a.mp4\n@gap = 4\n1. Q\n[* a]\n")
            .unwrap();
        assert_eq!(sets[0].questions[0].gap, Some(2.0));
    }

    #[test]
    fn test_unconsumed_gap_is_dropped_at_cue() {
        let text = "\
video: a.mp4
@gap=3
video: b.mp4
1. Q
[* a]
";
        let sets = parse(text).unwrap();
        assert!(sets[0].questions.is_empty());
        assert_eq!(sets[1].questions[0].gap, None);
    }

    #[test]
    fn test_directive_inside_choices_keeps_run() {
        let sets = parse("video: a.mp4\n1. Q\n[* a]\n@gap=2\n[* b]\n").unwrap();
        let question = &sets[0].questions[0];
        assert_eq!(
            question.kind,
            QuestionKind::MultipleChoice(vec![Choice::new("a", true), Choice::new("b", true)])
        );
        assert_eq!(question.gap, None);

        let text = "\
video: a.mp4
1. Q
[a]
@gap=2
[* b]
2. R
[* c]
";
        let sets = parse(text).unwrap();
        assert_eq!(
            sets[0].questions[0].kind,
            QuestionKind::SingleChoice(vec![Choice::new("a", false), Choice::new("b", true)])
        );
        assert_eq!(sets[0].questions[0].gap, None);
        assert_eq!(sets[0].questions[1].gap, Some(2.0));
    }

    #[test]
    fn test_gap_before_question_survives_directive_in_its_choices() {
        let sets = parse("video: a.mp4\n@gap=4\n1. Q\n[* a]\n@gap=1\n[b]\n").unwrap();
        assert_eq!(sets[0].questions[0].gap, Some(4.0));
        assert_eq!(sets[0].questions[0].kind.choices().len(), 2);
    }

    #[test]
    fn test_leading_bom_is_stripped() {
        let sets = parse("\u{feff}video: a.mp4\n1. Q\n[* a]\n").unwrap();
        assert_eq!(sets.len(), 1);
        assert_eq!(sets[0].video, "a.mp4");
        assert_eq!(sets[0].questions.len(), 1);
    }

    #[test]
    fn test_scaled_gap_must_be_finite() {
        let segments = segments();
        let mut timeline = Timeline::new(&segments, CuePolicy::Strict);
        let settings = ParserSettings {
            gap_unit: 10.0,
            ..ParserSettings::default()
        };
        let err = QuestionBankParser::new(&mut timeline, settings)
            .parse("video: a.mp4\n@gap=1e308\n1. Q\n[* a]\n")
            .unwrap_err();
        assert!(matches!(err, QuizcutError::Format { line: 2, .. }));
    }

    #[test]
    fn test_unknown_directive_ignored() {
        let sets = parse("video: a.mp4\n@pause=true\n1. Q\n[* a]\n").unwrap();
        assert_eq!(sets[0].questions[0].gap, None);
    }

    #[test]
    fn test_invalid_gap_is_format_error() {
        let err = parse("video: a.mp4\n@gap=soon\n1. Q\n[* a]\n").unwrap_err();
        assert!(matches!(err, QuizcutError::Format { line: 2, .. }));

        let err = parse("video: a.mp4\n@gap=-1\n1. Q\n[* a]\n").unwrap_err();
        assert!(err.to_string().contains("invalid gap value"));
    }

    #[test]
    fn test_zero_correct_choices_fails() {
        let text = "\
video: a.mp4
1. Fine
[* a]
2. Broken question
[a]
[b]
";
        let err = parse(text).unwrap_err();
        assert!(matches!(err, QuizcutError::Format { line: 4, .. }));
        assert!(err.to_string().contains("Broken question"));
    }

    #[test]
    fn test_question_without_choices_fails_at_end_of_input() {
        let err = parse("video: a.mp4\n1. Lonely").unwrap_err();
        assert!(err.to_string().contains("'Lonely' has no correct choice"));
    }

    #[test]
    fn test_empty_cue_and_labels_fail() {
        let err = parse("video:   \n").unwrap_err();
        assert!(err.to_string().contains("no segment identifier"));

        let err = parse("video: a.mp4\n1. Q\n[*]\n").unwrap_err();
        assert!(err.to_string().contains("has no label"));

        let err = parse("video: a.mp4\n1.\n[* a]\n").unwrap_err();
        assert!(err.to_string().contains("has no title"));
    }

    #[test]
    fn test_questions_before_cue_ignored() {
        let text = "\
1. Orphan
[* a]
video: a.mp4
1. Anchored
[* b]
";
        let sets = parse(text).unwrap();
        assert_eq!(sets.len(), 1);
        assert_eq!(sets[0].questions.len(), 1);
        assert_eq!(sets[0].questions[0].title, "Anchored");
    }

    #[test]
    fn test_cue_without_questions_keeps_set() {
        let sets = parse("video: a.mp4\nvideo: b.mp4\n1. Q\n[* a]\n").unwrap();
        assert_eq!(sets.len(), 2);
        assert!(sets[0].questions.is_empty());
        assert_eq!(sets[0].end_time, 10.0);
    }

    #[test]
    fn test_strict_cue_mismatch_propagates() {
        let err = parse("video: b.mp4\n1. Q\n[* a]\n").unwrap_err();
        assert!(matches!(err, QuizcutError::CueMismatch { .. }));
    }

    #[test]
    fn test_lenient_cue_mismatch_keeps_time() {
        let segments = segments();
        let mut timeline = Timeline::new(&segments, CuePolicy::Lenient);
        let sets = QuestionBankParser::new(&mut timeline, ParserSettings::default())
            .parse("video: b.mp4\n1. Q\n[* a]\nvideo: a.mp4\n")
            .unwrap();

        assert_eq!(sets[0].start_time, 0.0);
        assert_eq!(sets[1].start_time, 10.0);
        assert_eq!(timeline.remaining().len(), 1);
    }

    #[test]
    fn test_start_times_non_decreasing() {
        let segments = vec![
            VideoSegment::new("a", 3.0),
            VideoSegment::new("b", 0.0),
            VideoSegment::new("c", 4.0),
        ];
        let mut timeline = Timeline::new(&segments, CuePolicy::Lenient);
        let sets = QuestionBankParser::new(&mut timeline, ParserSettings::default())
            .parse("video: a\nvideo: x\nvideo: b\nvideo: c\n")
            .unwrap();

        let starts: Vec<_> = sets.iter().map(|s| s.start_time).collect();
        assert_eq!(starts, vec![3.0, 3.0, 3.0, 7.0]);
        assert!(starts.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_custom_correct_marker() {
        let segments = segments();
        let mut timeline = Timeline::new(&segments, CuePolicy::Strict);
        let settings = ParserSettings {
            correct_marker: '+',
            ..ParserSettings::default()
        };
        let sets = QuestionBankParser::new(&mut timeline, settings)
            .parse("video: a.mp4\n1. Q\n[+ right]\n[* wrong]\n")
            .unwrap();
        assert_eq!(
            sets[0].questions[0].kind.choices(),
            &[Choice::new("right", true), Choice::new("* wrong", false)]
        );
    }

    #[test]
    fn test_line_cursor_pushback() {
        let mut cursor = LineCursor::new("one\n two \nthree");
        assert_eq!(cursor.next().unwrap().text, "one");
        let second = cursor.next().unwrap();
        assert_eq!((second.number, second.text), (2, "two"));
        cursor.unread();
        assert_eq!(cursor.next().unwrap().number, 2);
        assert_eq!(cursor.next().unwrap().text, "three");
        assert!(cursor.next().is_none());
    }
}
