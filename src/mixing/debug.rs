//! Debug-only helpers for chain logging.

use std::fmt::Write;

use super::types::{ChannelTarget, MixOperation};

fn target_label(target: ChannelTarget) -> String {
    match target {
        ChannelTarget::All => "*".to_string(),
        ChannelTarget::Channel(ch) => ch.to_string(),
    }
}

fn bound_label(bound: Option<i64>) -> String {
    bound.map_or_else(|| "~".to_string(), |value| value.to_string())
}

/// Render a single operation in a compact, stable form.
pub fn describe_operation(op: &MixOperation) -> String {
    match *op {
        MixOperation::Swap { a, b } => format!("swap {}<>{}", a, b),
        MixOperation::Add { dst, src, gain } => format!("add {}+{}*{}", dst, src, gain),
        MixOperation::Volume { target, gain } => {
            format!("volume {}*{}", target_label(target), gain)
        }
        MixOperation::Limit { target, gain } => format!("limit {}@{}", target_label(target), gain),
        MixOperation::Upmix { dst } => format!("upmix {}", dst),
        MixOperation::Downmix { dst } => format!("downmix {}", dst),
        MixOperation::Truncate { channels } => format!("truncate {}", channels),
        MixOperation::Fade { target, envelope } => format!(
            "fade {} {}~{} {} {}:{}:{}:{}",
            target_label(target),
            envelope.vol_start,
            envelope.vol_end,
            envelope.shape.tag(),
            bound_label(envelope.pre),
            envelope.start,
            envelope.end,
            bound_label(envelope.post),
        ),
    }
}

/// Render the whole chain, one numbered operation per line.
pub fn describe_chain(chain: &[MixOperation]) -> String {
    let mut out = String::new();
    for (index, op) in chain.iter().enumerate() {
        let _ = writeln!(out, "{:3}: {}", index, describe_operation(op));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::fade::{FadeEnvelope, FadeShape};

    #[test]
    fn describes_every_operation_kind() {
        let chain = [
            MixOperation::Swap { a: 0, b: 1 },
            MixOperation::Truncate { channels: 1 },
            MixOperation::Fade {
                target: ChannelTarget::All,
                envelope: FadeEnvelope {
                    vol_start: 1.0,
                    vol_end: 0.0,
                    shape: FadeShape::RaisedCosine,
                    pre: None,
                    start: 10,
                    end: 20,
                    post: None,
                },
            },
        ];
        let text = describe_chain(&chain);
        assert!(text.contains("swap 0<>1"));
        assert!(text.contains("truncate 1"));
        assert!(text.contains("fade * 1~0 H ~:10:20:~"));
        assert_eq!(text.lines().count(), 3);
    }
}
