/// Fixed-layout ITCH record decoder
///
/// `Decoder::decode` validates the tag and the exact canonical length, then
/// extracts every field at its fixed offset into an owned, `Copy` record.
/// No allocation and no tokenizing; the input slice is only borrowed for the
/// duration of the call.

use crate::protocol::*;
use byteorder::{BigEndian, ByteOrder};
use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    #[error("empty message buffer")]
    Empty,

    #[error("unknown message tag: {0:#04x}")]
    UnknownTag(u8),

    #[error("size mismatch for tag {tag:#04x}: expected {expected} bytes, got {actual}")]
    SizeMismatch { tag: u8, expected: usize, actual: usize },
}

pub type DecodeResult<T> = Result<T, DecodeError>;

/// Record families, for routing without matching every kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageFamily {
    Administrative,
    OrderBook,
    Trade,
    Indicator,
}

/// One decoded ITCH record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Message {
    SystemEvent(SystemEvent),
    StockDirectory(StockDirectory),
    StockTradingAction(StockTradingAction),
    RegShoRestriction(RegShoRestriction),
    MarketParticipantPosition(MarketParticipantPosition),
    MwcbDeclineLevel(MwcbDeclineLevel),
    MwcbStatus(MwcbStatus),
    IpoQuotingPeriodUpdate(IpoQuotingPeriodUpdate),
    LuldAuctionCollar(LuldAuctionCollar),
    OperationalHalt(OperationalHalt),
    AddOrder(AddOrder),
    AddOrderMpid(AddOrderMpid),
    OrderExecuted(OrderExecuted),
    OrderExecutedWithPrice(OrderExecutedWithPrice),
    OrderCancel(OrderCancel),
    OrderDelete(OrderDelete),
    OrderReplace(OrderReplace),
    TradeNonCross(TradeNonCross),
    CrossTrade(CrossTrade),
    BrokenTrade(BrokenTrade),
    Noii(Noii),
    Rpii(Rpii),
    Dlcr(Dlcr),
}

impl Message {
    /// Common header shared by every record kind
    pub fn header(&self) -> &MessageHeader {
        match self {
            Message::SystemEvent(m) => &m.header,
            Message::StockDirectory(m) => &m.header,
            Message::StockTradingAction(m) => &m.header,
            Message::RegShoRestriction(m) => &m.header,
            Message::MarketParticipantPosition(m) => &m.header,
            Message::MwcbDeclineLevel(m) => &m.header,
            Message::MwcbStatus(m) => &m.header,
            Message::IpoQuotingPeriodUpdate(m) => &m.header,
            Message::LuldAuctionCollar(m) => &m.header,
            Message::OperationalHalt(m) => &m.header,
            Message::AddOrder(m) => &m.header,
            Message::AddOrderMpid(m) => &m.header,
            Message::OrderExecuted(m) => &m.header,
            Message::OrderExecutedWithPrice(m) => &m.header,
            Message::OrderCancel(m) => &m.header,
            Message::OrderDelete(m) => &m.header,
            Message::OrderReplace(m) => &m.header,
            Message::TradeNonCross(m) => &m.header,
            Message::CrossTrade(m) => &m.header,
            Message::BrokenTrade(m) => &m.header,
            Message::Noii(m) => &m.header,
            Message::Rpii(m) => &m.header,
            Message::Dlcr(m) => &m.header,
        }
    }

    pub fn timestamp(&self) -> u64 {
        self.header().timestamp
    }

    pub fn stock_locate(&self) -> u16 {
        self.header().stock_locate
    }

    pub fn message_type(&self) -> MessageType {
        match self {
            Message::SystemEvent(_) => MessageType::SystemEvent,
            Message::StockDirectory(_) => MessageType::StockDirectory,
            Message::StockTradingAction(_) => MessageType::StockTradingAction,
            Message::RegShoRestriction(_) => MessageType::RegShoRestriction,
            Message::MarketParticipantPosition(_) => MessageType::MarketParticipantPosition,
            Message::MwcbDeclineLevel(_) => MessageType::MwcbDeclineLevel,
            Message::MwcbStatus(_) => MessageType::MwcbStatus,
            Message::IpoQuotingPeriodUpdate(_) => MessageType::IpoQuotingPeriodUpdate,
            Message::LuldAuctionCollar(_) => MessageType::LuldAuctionCollar,
            Message::OperationalHalt(_) => MessageType::OperationalHalt,
            Message::AddOrder(_) => MessageType::AddOrder,
            Message::AddOrderMpid(_) => MessageType::AddOrderMpid,
            Message::OrderExecuted(_) => MessageType::OrderExecuted,
            Message::OrderExecutedWithPrice(_) => MessageType::OrderExecutedWithPrice,
            Message::OrderCancel(_) => MessageType::OrderCancel,
            Message::OrderDelete(_) => MessageType::OrderDelete,
            Message::OrderReplace(_) => MessageType::OrderReplace,
            Message::TradeNonCross(_) => MessageType::TradeNonCross,
            Message::CrossTrade(_) => MessageType::CrossTrade,
            Message::BrokenTrade(_) => MessageType::BrokenTrade,
            Message::Noii(_) => MessageType::Noii,
            Message::Rpii(_) => MessageType::Rpii,
            Message::Dlcr(_) => MessageType::Dlcr,
        }
    }

    pub fn tag(&self) -> u8 {
        self.message_type() as u8
    }

    pub fn name(&self) -> &'static str {
        self.message_type().name()
    }

    pub fn family(&self) -> MessageFamily {
        match self {
            Message::SystemEvent(_)
            | Message::StockDirectory(_)
            | Message::StockTradingAction(_)
            | Message::RegShoRestriction(_)
            | Message::MarketParticipantPosition(_)
            | Message::MwcbDeclineLevel(_)
            | Message::MwcbStatus(_)
            | Message::IpoQuotingPeriodUpdate(_)
            | Message::LuldAuctionCollar(_)
            | Message::OperationalHalt(_) => MessageFamily::Administrative,

            Message::AddOrder(_)
            | Message::AddOrderMpid(_)
            | Message::OrderExecuted(_)
            | Message::OrderExecutedWithPrice(_)
            | Message::OrderCancel(_)
            | Message::OrderDelete(_)
            | Message::OrderReplace(_) => MessageFamily::OrderBook,

            Message::TradeNonCross(_) | Message::CrossTrade(_) | Message::BrokenTrade(_) => {
                MessageFamily::Trade
            }

            Message::Noii(_) | Message::Rpii(_) | Message::Dlcr(_) => MessageFamily::Indicator,
        }
    }

    pub fn is_order_book(&self) -> bool {
        self.family() == MessageFamily::OrderBook
    }
}

/// Stateless ITCH decoder
pub struct Decoder;

impl Decoder {
    /// Decode exactly one record. `buf` must hold the whole record and nothing else.
    pub fn decode(buf: &[u8]) -> DecodeResult<Message> {
        let tag = *buf.first().ok_or(DecodeError::Empty)?;
        let ty = MessageType::from_u8(tag).ok_or(DecodeError::UnknownTag(tag))?;

        let expected = ty.wire_len();
        if buf.len() != expected {
            return Err(DecodeError::SizeMismatch {
                tag,
                expected,
                actual: buf.len(),
            });
        }

        let h = read_header(buf);
        let msg = match ty {
            MessageType::SystemEvent => Message::SystemEvent(SystemEvent {
                header: h,
                event_code: buf[11],
            }),
            MessageType::StockDirectory => Message::StockDirectory(StockDirectory {
                header: h,
                symbol: Symbol::from_wire(&buf[11..]),
                market_category: buf[19],
                financial_status: buf[20],
                round_lot_size: BigEndian::read_u32(&buf[21..25]),
                round_lots_only: buf[25],
                issue_classification: buf[26],
                issue_subtype: Alpha::from_wire(&buf[27..]),
                authenticity: buf[29],
                short_sale_threshold: buf[30],
                ipo_flag: buf[31],
                luld_price_tier: buf[32],
                etp_flag: buf[33],
                etp_leverage_factor: BigEndian::read_u32(&buf[34..38]),
                inverse_indicator: buf[38],
            }),
            MessageType::StockTradingAction => Message::StockTradingAction(StockTradingAction {
                header: h,
                symbol: Symbol::from_wire(&buf[11..]),
                trading_state: buf[19],
                reserved: buf[20],
                reason: Alpha::from_wire(&buf[21..]),
            }),
            MessageType::RegShoRestriction => Message::RegShoRestriction(RegShoRestriction {
                header: h,
                symbol: Symbol::from_wire(&buf[11..]),
                reg_sho_action: buf[19],
            }),
            MessageType::MarketParticipantPosition => {
                Message::MarketParticipantPosition(MarketParticipantPosition {
                    header: h,
                    mpid: Alpha::from_wire(&buf[11..]),
                    symbol: Symbol::from_wire(&buf[15..]),
                    primary_market_maker: buf[23],
                    market_maker_mode: buf[24],
                    market_participant_state: buf[25],
                })
            }
            MessageType::MwcbDeclineLevel => Message::MwcbDeclineLevel(MwcbDeclineLevel {
                header: h,
                level1: BigEndian::read_u64(&buf[11..19]),
                level2: BigEndian::read_u64(&buf[19..27]),
                level3: BigEndian::read_u64(&buf[27..35]),
            }),
            MessageType::MwcbStatus => Message::MwcbStatus(MwcbStatus {
                header: h,
                breached_level: buf[11],
            }),
            MessageType::IpoQuotingPeriodUpdate => {
                Message::IpoQuotingPeriodUpdate(IpoQuotingPeriodUpdate {
                    header: h,
                    symbol: Symbol::from_wire(&buf[11..]),
                    release_time: BigEndian::read_u32(&buf[19..23]),
                    release_qualifier: buf[23],
                    ipo_price: BigEndian::read_u32(&buf[24..28]),
                })
            }
            MessageType::LuldAuctionCollar => Message::LuldAuctionCollar(LuldAuctionCollar {
                header: h,
                symbol: Symbol::from_wire(&buf[11..]),
                reference_price: BigEndian::read_u32(&buf[19..23]),
                upper_collar_price: BigEndian::read_u32(&buf[23..27]),
                lower_collar_price: BigEndian::read_u32(&buf[27..31]),
                collar_extension: BigEndian::read_u32(&buf[31..35]),
            }),
            MessageType::OperationalHalt => Message::OperationalHalt(OperationalHalt {
                header: h,
                symbol: Symbol::from_wire(&buf[11..]),
                market_code: buf[19],
                halt_action: buf[20],
            }),
            MessageType::AddOrder => Message::AddOrder(AddOrder {
                header: h,
                order_ref: BigEndian::read_u64(&buf[11..19]),
                side: buf[19],
                shares: BigEndian::read_u32(&buf[20..24]),
                symbol: Symbol::from_wire(&buf[24..]),
                price: BigEndian::read_u32(&buf[32..36]),
            }),
            MessageType::AddOrderMpid => Message::AddOrderMpid(AddOrderMpid {
                header: h,
                order_ref: BigEndian::read_u64(&buf[11..19]),
                side: buf[19],
                shares: BigEndian::read_u32(&buf[20..24]),
                symbol: Symbol::from_wire(&buf[24..]),
                price: BigEndian::read_u32(&buf[32..36]),
                attribution: Alpha::from_wire(&buf[36..]),
            }),
            MessageType::OrderExecuted => Message::OrderExecuted(OrderExecuted {
                header: h,
                order_ref: BigEndian::read_u64(&buf[11..19]),
                executed_shares: BigEndian::read_u32(&buf[19..23]),
                match_number: BigEndian::read_u64(&buf[23..31]),
            }),
            MessageType::OrderExecutedWithPrice => {
                Message::OrderExecutedWithPrice(OrderExecutedWithPrice {
                    header: h,
                    order_ref: BigEndian::read_u64(&buf[11..19]),
                    executed_shares: BigEndian::read_u32(&buf[19..23]),
                    match_number: BigEndian::read_u64(&buf[23..31]),
                    printable: buf[31],
                    execution_price: BigEndian::read_u32(&buf[32..36]),
                })
            }
            MessageType::OrderCancel => Message::OrderCancel(OrderCancel {
                header: h,
                order_ref: BigEndian::read_u64(&buf[11..19]),
                cancelled_shares: BigEndian::read_u32(&buf[19..23]),
            }),
            MessageType::OrderDelete => Message::OrderDelete(OrderDelete {
                header: h,
                order_ref: BigEndian::read_u64(&buf[11..19]),
            }),
            MessageType::OrderReplace => Message::OrderReplace(OrderReplace {
                header: h,
                original_ref: BigEndian::read_u64(&buf[11..19]),
                new_ref: BigEndian::read_u64(&buf[19..27]),
                shares: BigEndian::read_u32(&buf[27..31]),
                price: BigEndian::read_u32(&buf[31..35]),
            }),
            MessageType::TradeNonCross => Message::TradeNonCross(TradeNonCross {
                header: h,
                order_ref: BigEndian::read_u64(&buf[11..19]),
                side: buf[19],
                shares: BigEndian::read_u32(&buf[20..24]),
                symbol: Symbol::from_wire(&buf[24..]),
                price: BigEndian::read_u32(&buf[32..36]),
                match_number: BigEndian::read_u64(&buf[36..44]),
            }),
            MessageType::CrossTrade => Message::CrossTrade(CrossTrade {
                header: h,
                shares: BigEndian::read_u64(&buf[11..19]),
                symbol: Symbol::from_wire(&buf[19..]),
                cross_price: BigEndian::read_u32(&buf[27..31]),
                match_number: BigEndian::read_u64(&buf[31..39]),
                cross_type: buf[39],
            }),
            MessageType::BrokenTrade => Message::BrokenTrade(BrokenTrade {
                header: h,
                match_number: BigEndian::read_u64(&buf[11..19]),
            }),
            MessageType::Noii => Message::Noii(Noii {
                header: h,
                paired_shares: BigEndian::read_u64(&buf[11..19]),
                imbalance_shares: BigEndian::read_u64(&buf[19..27]),
                imbalance_direction: buf[27],
                symbol: Symbol::from_wire(&buf[28..]),
                far_price: BigEndian::read_u32(&buf[36..40]),
                near_price: BigEndian::read_u32(&buf[40..44]),
                current_reference_price: BigEndian::read_u32(&buf[44..48]),
                cross_type: buf[48],
                price_variation_indicator: buf[49],
            }),
            MessageType::Rpii => Message::Rpii(Rpii {
                header: h,
                symbol: Symbol::from_wire(&buf[11..]),
                interest_flag: buf[19],
            }),
            MessageType::Dlcr => Message::Dlcr(Dlcr {
                header: h,
                symbol: Symbol::from_wire(&buf[11..]),
                open_eligibility_status: buf[19],
                min_allowable_price: BigEndian::read_u32(&buf[20..24]),
                max_allowable_price: BigEndian::read_u32(&buf[24..28]),
                near_execution_price: BigEndian::read_u32(&buf[28..32]),
                near_execution_time: BigEndian::read_u64(&buf[32..40]),
                lower_price_range_collar: BigEndian::read_u32(&buf[40..44]),
                upper_price_range_collar: BigEndian::read_u32(&buf[44..48]),
            }),
        };

        Ok(msg)
    }

    /// Peek at the tag without decoding the body
    pub fn message_type(buf: &[u8]) -> DecodeResult<MessageType> {
        let tag = *buf.first().ok_or(DecodeError::Empty)?;
        MessageType::from_u8(tag).ok_or(DecodeError::UnknownTag(tag))
    }
}

// Caller guarantees buf.len() >= HEADER_SIZE
#[inline]
fn read_header(buf: &[u8]) -> MessageHeader {
    MessageHeader {
        stock_locate: BigEndian::read_u16(&buf[OFF_STOCK_LOCATE..OFF_TRACKING_NUMBER]),
        tracking_number: BigEndian::read_u16(&buf[OFF_TRACKING_NUMBER..OFF_TIMESTAMP]),
        timestamp: BigEndian::read_u48(&buf[OFF_TIMESTAMP..HEADER_SIZE]),
    }
}
