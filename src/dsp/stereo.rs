//! Mid/side stereo tools and channel-layout helpers

use crate::chain::stage::StereoToolsParams;
use crate::types::AudioBuffer;

/// Rescale mid and side and shift side energy between the channels
///
/// Buffers that are not stereo are left alone.
pub fn stereo_tools(buffer: &mut AudioBuffer, params: &StereoToolsParams) {
    if buffer.num_channels() != 2 {
        return;
    }
    let balance = params.side_balance.clamp(-1.0, 1.0);
    let (left, right) = buffer.channels.split_at_mut(1);
    for (l, r) in left[0].iter_mut().zip(right[0].iter_mut()) {
        let mid = (*l + *r) * 0.5 * params.mid_level;
        let side = (*l - *r) * 0.5 * params.side_level;
        *l = mid + side * (1.0 - balance);
        *r = mid - side * (1.0 + balance);
    }
}

/// Force a channel count: mono is duplicated, extra channels are dropped
pub fn to_channel_count(buffer: &mut AudioBuffer, channels: usize) {
    let channels = channels.max(1);
    match buffer.num_channels() {
        0 => buffer.channels = vec![Vec::new(); channels],
        n if n == channels => {}
        1 => {
            let mono = buffer.channels[0].clone();
            buffer.channels = vec![mono; channels];
        }
        n if n > channels => buffer.channels.truncate(channels),
        _ => {
            // Fewer channels than requested: repeat the last one
            while buffer.num_channels() < channels {
                let last = buffer.channels[buffer.num_channels() - 1].clone();
                buffer.channels.push(last);
            }
        }
    }
}
