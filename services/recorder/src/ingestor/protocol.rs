//! Kite binary frame decoding
//!
//! A binary frame is `[num_packets u16 BE]` followed by
//! `[len u16 BE][packet]` pairs. Packet structure is keyed by length:
//! 8 bytes is LTP, 28/32 are index quote/full, 44 is quote mode and
//! 184 is full mode for tradable instruments. All prices are `i32` in
//! paise, big-endian.

use recorder_common::constants::PRICE_DIVISOR;
use recorder_common::TickData;
use tracing::trace;

const LTP_PACKET: usize = 8;
const INDEX_QUOTE_PACKET: usize = 28;
const INDEX_FULL_PACKET: usize = 32;
const QUOTE_PACKET: usize = 44;
const FULL_PACKET: usize = 184;

/// Decode one binary frame into ticks. Unknown packet lengths are
/// skipped, not errors; the feed may introduce new packet types.
#[must_use]
pub fn parse_binary_ticks(data: &[u8]) -> Vec<TickData> {
    if data.len() < 2 {
        return Vec::new();
    }

    let num_packets = usize::from(u16::from_be_bytes([data[0], data[1]]));
    let mut ticks = Vec::with_capacity(num_packets);
    let mut offset = 2;

    for _ in 0..num_packets {
        if offset + 2 > data.len() {
            break;
        }
        let packet_len = usize::from(u16::from_be_bytes([data[offset], data[offset + 1]]));
        offset += 2;

        if offset + packet_len > data.len() {
            break;
        }
        let packet = &data[offset..offset + packet_len];
        offset += packet_len;

        if let Some(tick) = parse_packet(packet) {
            ticks.push(tick);
        } else {
            trace!(len = packet_len, "skipping unrecognized packet");
        }
    }

    ticks
}

fn parse_packet(packet: &[u8]) -> Option<TickData> {
    if packet.len() < LTP_PACKET {
        return None;
    }

    let token = read_u32(packet, 0);
    let last_price = read_price(packet, 4);

    match packet.len() {
        LTP_PACKET => Some(TickData {
            instrument_token: token,
            exchange_timestamp: None,
            last_price,
            average_price: None,
            total_buy_qty: None,
            total_sell_qty: None,
            volume: None,
            open_interest: None,
        }),
        // index packets carry OHLC and change after the price; only the
        // full variant appends an exchange timestamp
        INDEX_QUOTE_PACKET | INDEX_FULL_PACKET => {
            let ts = (packet.len() == INDEX_FULL_PACKET)
                .then(|| i64::from(read_i32(packet, 28)));
            Some(TickData {
                instrument_token: token,
                exchange_timestamp: ts,
                last_price,
                average_price: None,
                total_buy_qty: None,
                total_sell_qty: None,
                volume: None,
                open_interest: None,
            })
        }
        QUOTE_PACKET | FULL_PACKET => {
            let full = packet.len() == FULL_PACKET;
            Some(TickData {
                instrument_token: token,
                exchange_timestamp: full.then(|| i64::from(read_i32(packet, 60))),
                last_price,
                average_price: Some(read_price(packet, 12)),
                total_buy_qty: Some(read_u32(packet, 20)),
                total_sell_qty: Some(read_u32(packet, 24)),
                volume: Some(read_u32(packet, 16)),
                open_interest: full.then(|| read_u32(packet, 48)),
            })
        }
        _ => None,
    }
}

fn read_u32(packet: &[u8], at: usize) -> u32 {
    u32::from_be_bytes([packet[at], packet[at + 1], packet[at + 2], packet[at + 3]])
}

fn read_i32(packet: &[u8], at: usize) -> i32 {
    i32::from_be_bytes([packet[at], packet[at + 1], packet[at + 2], packet[at + 3]])
}

fn read_price(packet: &[u8], at: usize) -> f64 {
    f64::from(read_i32(packet, at)) / PRICE_DIVISOR
}

#[cfg(test)]
mod tests {
    use super::*;

    fn put_u32(buf: &mut [u8], at: usize, value: u32) {
        buf[at..at + 4].copy_from_slice(&value.to_be_bytes());
    }

    fn frame(packets: &[&[u8]]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&(packets.len() as u16).to_be_bytes());
        for p in packets {
            out.extend_from_slice(&(p.len() as u16).to_be_bytes());
            out.extend_from_slice(p);
        }
        out
    }

    #[test]
    fn ltp_packet_price_only() {
        let mut p = [0u8; 8];
        put_u32(&mut p, 0, 408065);
        put_u32(&mut p, 4, 123_450); // 1234.50 in paise

        let ticks = parse_binary_ticks(&frame(&[&p]));
        assert_eq!(ticks.len(), 1);
        assert_eq!(ticks[0].instrument_token, 408065);
        assert!((ticks[0].last_price - 1234.5).abs() < f64::EPSILON);
        assert!(ticks[0].exchange_timestamp.is_none());
        assert!(ticks[0].volume.is_none());
    }

    #[test]
    fn index_full_packet_carries_timestamp() {
        let mut p = [0u8; 32];
        put_u32(&mut p, 0, 256265);
        put_u32(&mut p, 4, 2_150_000);
        put_u32(&mut p, 28, 1_700_000_000);

        let ticks = parse_binary_ticks(&frame(&[&p]));
        assert_eq!(ticks[0].exchange_timestamp, Some(1_700_000_000));
        assert!((ticks[0].last_price - 21_500.0).abs() < f64::EPSILON);
    }

    #[test]
    fn quote_packet_has_quantities_but_no_timestamp_or_oi() {
        let mut p = [0u8; 44];
        put_u32(&mut p, 0, 738561);
        put_u32(&mut p, 4, 250_075); // 2500.75
        put_u32(&mut p, 12, 249_900);
        put_u32(&mut p, 16, 1_200_000);
        put_u32(&mut p, 20, 55_000);
        put_u32(&mut p, 24, 48_000);

        let ticks = parse_binary_ticks(&frame(&[&p]));
        let tick = &ticks[0];
        assert_eq!(tick.instrument_token, 738561);
        assert!((tick.last_price - 2_500.75).abs() < f64::EPSILON);
        assert!((tick.average_price.unwrap() - 2_499.0).abs() < f64::EPSILON);
        assert_eq!(tick.volume, Some(1_200_000));
        assert_eq!(tick.total_buy_qty, Some(55_000));
        assert_eq!(tick.total_sell_qty, Some(48_000));
        assert!(tick.exchange_timestamp.is_none());
        assert!(tick.open_interest.is_none());
    }

    #[test]
    fn full_packet_carries_quantities_and_oi() {
        let mut p = [0u8; 184];
        put_u32(&mut p, 0, 12345);
        put_u32(&mut p, 4, 50_000);
        put_u32(&mut p, 12, 49_900);
        put_u32(&mut p, 16, 7_500);
        put_u32(&mut p, 20, 300);
        put_u32(&mut p, 24, 400);
        put_u32(&mut p, 48, 9_000);
        put_u32(&mut p, 60, 1_700_000_123);

        let ticks = parse_binary_ticks(&frame(&[&p]));
        let tick = &ticks[0];
        assert_eq!(tick.volume, Some(7_500));
        assert_eq!(tick.total_buy_qty, Some(300));
        assert_eq!(tick.total_sell_qty, Some(400));
        assert_eq!(tick.open_interest, Some(9_000));
        assert_eq!(tick.exchange_timestamp, Some(1_700_000_123));
        assert!((tick.average_price.unwrap() - 499.0).abs() < f64::EPSILON);
    }

    #[test]
    fn truncated_frame_stops_cleanly() {
        let mut p = [0u8; 8];
        put_u32(&mut p, 0, 1);
        let mut bytes = frame(&[&p, &p]);
        bytes.truncate(bytes.len() - 4); // second packet cut short

        assert_eq!(parse_binary_ticks(&bytes).len(), 1);
    }

    #[test]
    fn unknown_packet_length_skipped() {
        let odd = [0u8; 17];
        let mut p = [0u8; 8];
        put_u32(&mut p, 0, 7);

        let ticks = parse_binary_ticks(&frame(&[&odd, &p]));
        assert_eq!(ticks.len(), 1);
        assert_eq!(ticks[0].instrument_token, 7);
    }
}
