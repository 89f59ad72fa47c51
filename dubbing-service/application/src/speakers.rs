use std::collections::HashMap;

use dubbing_domain::{Segment, SpeakerTurn};

/// Labels each segment and word with the speaker whose turns overlap it most.
/// Spans that touch no turn keep `speaker = None`.
pub fn assign_speakers(segments: &mut [Segment], turns: &[SpeakerTurn]) {
    if turns.is_empty() {
        return;
    }
    for segment in segments.iter_mut() {
        segment.speaker = dominant_speaker(segment.start_ms, segment.end_ms, turns);
        for word in &mut segment.words {
            word.speaker = dominant_speaker(word.start_ms, word.end_ms, turns);
        }
    }
}

fn dominant_speaker(start_ms: u64, end_ms: u64, turns: &[SpeakerTurn]) -> Option<String> {
    let mut overlap_by_speaker: HashMap<&str, u64> = HashMap::new();
    for turn in turns {
        let overlap = end_ms
            .min(turn.end_ms)
            .saturating_sub(start_ms.max(turn.start_ms));
        if overlap > 0 {
            *overlap_by_speaker.entry(turn.speaker.as_str()).or_default() += overlap;
        }
    }
    overlap_by_speaker
        .into_iter()
        .max_by(|(a_name, a), (b_name, b)| a.cmp(b).then_with(|| b_name.cmp(a_name)))
        .map(|(speaker, _)| speaker.to_string())
}
