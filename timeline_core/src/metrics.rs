use bevy::prelude::*;

use crate::GeneratedTimelines;

#[derive(Resource, Default, Debug, Clone, PartialEq)]
pub struct GenerationSummary {
    pub runs: u64,
    pub platforms: usize,
    pub time_steps: usize,
    pub scored_steps: usize,
    pub crisis_steps: usize,
    pub maximum_score: f64,
    pub failed: bool,
}

pub fn collect_generation_summary(
    generated: Res<GeneratedTimelines>,
    mut summary: ResMut<GenerationSummary>,
) {
    summary.runs += 1;
    let Some(result) = generated.result() else {
        return;
    };
    match result {
        Ok(timelines) => {
            summary.failed = false;
            summary.platforms = timelines.len();
            summary.time_steps = timelines.iter().map(|timeline| timeline.len()).sum();
            summary.scored_steps = timelines
                .iter()
                .flat_map(|timeline| timeline.elements())
                .filter(|element| element.score > 0.0)
                .count();
            summary.crisis_steps = timelines
                .iter()
                .flat_map(|timeline| timeline.elements())
                .filter(|element| element.crisis_level > 0)
                .count();
            summary.maximum_score = timelines
                .iter()
                .map(|timeline| timeline.maximum_score())
                .fold(0.0, f64::max);
        }
        Err(_) => {
            let runs = summary.runs;
            *summary = GenerationSummary {
                runs,
                failed: true,
                ..Default::default()
            };
        }
    }
}
