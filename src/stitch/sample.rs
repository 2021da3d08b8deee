//! Stitching sample-encoded fragments.

use super::collect_in_window;
use crate::fragment::{merge_measurements, SampleData, SampleFragment};
use crate::slice::Interval;
use crate::utils::error::StitchError;
use log::debug;

/// Merge sample fragments into one with global frame and stack tables
///
/// Sample timestamps are absolute, so no time shifting is needed; only
/// samples inside `window` are kept.
pub fn stitch_samples(
    mut fragments: Vec<SampleFragment>,
    window: Interval,
) -> Result<SampleFragment, StitchError> {
    fragments.sort_by_key(|f| (f.start_ns(), f.end_ns()));

    let Some(first) = fragments.first() else {
        return Err(StitchError::NoFragments);
    };
    let mut merged = SampleFragment {
        id: first.id.clone(),
        profiler_id: first.profiler_id.clone(),
        organization_id: first.organization_id,
        project_id: first.project_id,
        platform: first.platform,
        profile: SampleData::default(),
        measurements: Default::default(),
    };

    for fragment in fragments {
        append(&mut merged, fragment, window)?;
    }

    merged
        .profile
        .samples
        .sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));

    debug!(
        "Stitched {} frames, {} stacks, {} samples",
        merged.profile.frames.len(),
        merged.profile.stacks.len(),
        merged.profile.samples.len()
    );
    Ok(merged)
}

fn append(
    merged: &mut SampleFragment,
    fragment: SampleFragment,
    window: Interval,
) -> Result<(), StitchError> {
    let frame_offset = merged.profile.frames.len();
    let stack_offset = merged.profile.stacks.len();
    let SampleData {
        frames,
        stacks,
        samples,
        thread_metadata,
    } = fragment.profile;

    merged.profile.frames.extend(frames);
    merged.profile.stacks.extend(
        stacks
            .into_iter()
            .map(|stack| stack.into_iter().map(|id| id + frame_offset).collect::<Vec<_>>()),
    );

    let (mut samples, _) = collect_in_window(samples, &(), &(), 0, 0, window)?;
    for sample in samples.iter_mut() {
        sample.stack_id += stack_offset;
    }
    merged.profile.samples.extend(samples);

    for (thread_id, metadata) in thread_metadata {
        merged.profile.thread_metadata.entry(thread_id).or_insert(metadata);
    }
    merge_measurements(&mut merged.measurements, fragment.measurements);
    Ok(())
}
