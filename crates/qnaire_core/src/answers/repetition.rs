//! Instance enumeration for repeatable question sets.
//!
//! # Responsibility
//! - Enumerate the set indices of a repeatable question set that hold data.
//! - Produce one labelled answer set per surviving index.
//!
//! # Invariants
//! - Labelled sets follow label discovery order.
//! - Unlabelled sets are probed from index 0 and enumeration stops at the
//!   first index without any answer; later indices are not visited.
//! - Sets without any answered question are omitted.

use crate::answers::format::AnswerFormatter;
use crate::answers::index::ValueIndex;
use crate::answers::tree::{collect_questions, AnswerSet};
use crate::answers::AnswerResult;
use crate::model::catalog::QuestionSet;
use crate::model::domain::AttributeId;
use log::debug;

/// Resolves the answered instances of `question_set`, bound to the
/// repeatable `attribute_id`.
pub fn resolve_repetitions(
    question_set: &QuestionSet,
    attribute_id: AttributeId,
    index: &ValueIndex<'_>,
    formatter: &AnswerFormatter<'_>,
) -> AnswerResult<Vec<AnswerSet>> {
    let mut sets = Vec::new();

    if let Some(labels) = index.labels(attribute_id) {
        for (set_index, label) in labels.iter() {
            let questions = collect_questions(&question_set.questions, index, formatter, set_index)?;
            if !questions.is_empty() {
                sets.push(AnswerSet {
                    id: label.to_string(),
                    questions,
                });
            }
        }
        debug!(
            "event=repetition_scan module=answers mode=labelled labels={} sets={}",
            labels.len(),
            sets.len()
        );
        return Ok(sets);
    }

    let mut set_index = 0_u32;
    loop {
        let questions = collect_questions(&question_set.questions, index, formatter, set_index)?;
        if questions.is_empty() {
            break;
        }
        sets.push(AnswerSet {
            id: format!("#{set_index}"),
            questions,
        });
        set_index += 1;
    }
    // Probing stops at the first gap; sparse indices after it are not reported.
    debug!(
        "event=repetition_scan module=answers mode=probe sets={} stopped_at={}",
        sets.len(),
        set_index
    );
    Ok(sets)
}
