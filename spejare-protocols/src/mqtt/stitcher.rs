//! Request/response stitching over per-connection frame deques.
//!
//! Matching is response-led: responses are expected near the head of their
//! deque, while requests may linger (pipelined, unanswered, or lost). Matched
//! requests are only marked at first and popped once they reach the head, so
//! out-of-order responses never cause mid-deque churn.

use std::collections::VecDeque;

use tracing::debug;

use crate::mqtt::types::{ControlPacketType, Message, Record};

/// Stitching knobs owned by the caller.
#[derive(Clone, Copy, Debug, Default)]
pub struct StitchOptions {
    /// Requests older than a response by more than this are evicted from the
    /// deque front and counted as errors. `None` disables aging; the caller
    /// then owns cleanup of requests whose responses were lost.
    pub max_request_age_ns: Option<u64>,
}

/// Records produced by one stitching pass plus the number of responses (and
/// aged-out requests) that found no partner.
#[derive(Debug, Default, PartialEq)]
pub struct StitchResult {
    pub records: Vec<Record>,
    pub error_count: u64,
}

/// True when `req` is the transaction partner of `resp`: same packet
/// identifier, or first-in-flight for the identifier-less pairs.
fn is_transaction_match(req: &Message, resp: &Message) -> bool {
    match (req.packet_identifier(), resp.packet_identifier()) {
        (Some(req_id), Some(resp_id)) => req_id == resp_id,
        (None, None) => matches!(
            (req.control_packet_type, resp.control_packet_type),
            (ControlPacketType::Connect, ControlPacketType::Connack)
                | (ControlPacketType::Pingreq, ControlPacketType::Pingresp)
        ),
        _ => false,
    }
}

/// Stitches with default options. See [`process_frames_with`].
pub fn process_frames(
    reqs: &mut VecDeque<Message>,
    resps: &mut VecDeque<Message>,
) -> StitchResult {
    process_frames_with(reqs, resps, StitchOptions::default())
}

/// Pairs each response with the earliest unconsumed request that shares its
/// transaction identity and does not postdate it. Matched responses pop;
/// unmatched responses are counted and left in place. Both deques must be
/// time-sorted; emitted records follow response timestamp order.
pub fn process_frames_with(
    reqs: &mut VecDeque<Message>,
    resps: &mut VecDeque<Message>,
    options: StitchOptions,
) -> StitchResult {
    let mut result = StitchResult::default();

    let mut resp_index = 0;
    while resp_index < resps.len() {
        let resp_timestamp = resps[resp_index].timestamp_ns;

        // Age out requests whose response window has clearly passed. Only the
        // head is eligible, which keeps eviction O(1) amortized.
        if let Some(max_age) = options.max_request_age_ns {
            while let Some(front) = reqs.front() {
                if !front.consumed
                    && resp_timestamp.saturating_sub(front.timestamp_ns) > max_age
                {
                    debug!(
                        packet_identifier = ?front.packet_identifier(),
                        control_packet_type = %front.control_packet_type,
                        "request aged out without a response"
                    );
                    result.error_count += 1;
                    reqs.pop_front();
                } else {
                    break;
                }
            }
        }

        let mut matched_req = None;
        for req in reqs.iter_mut() {
            // Requests are time-sorted: nothing past this one can be earlier
            // than the response.
            if req.timestamp_ns > resp_timestamp {
                break;
            }
            if req.consumed {
                continue;
            }
            if is_transaction_match(req, &resps[resp_index]) {
                matched_req = Some(req.clone());
                req.consumed = true;
                break;
            }
        }

        if let Some(req) = matched_req {
            let resp = resps
                .remove(resp_index)
                .expect("matched response index is in bounds");
            result.records.push(Record { req, resp });
        } else {
            debug!(
                packet_identifier = ?resps[resp_index].packet_identifier(),
                control_packet_type = %resps[resp_index].control_packet_type,
                "no request matching the response"
            );
            result.error_count += 1;
            resp_index += 1;
        }

        // Lazy compaction: consumed requests leave only from the head, after
        // every response, so the next scan starts at live entries.
        while reqs.front().is_some_and(|req| req.consumed) {
            reqs.pop_front();
        }
    }

    result
}
