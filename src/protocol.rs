/// NASDAQ ITCH 5.0 wire definitions
///
/// Every record shares an 11-byte prefix:
///   [tag(1)][stock_locate(2)][tracking_number(2)][timestamp(6)]
///
/// Multi-byte integers are big-endian on the wire. Alpha fields are ASCII,
/// left-justified and right-padded with spaces. Prices are unsigned fixed-point
/// integers in 1/10,000 of a dollar.

use std::fmt;

/// Fixed-point price, 4 implied decimals ($150.25 = 1_502_500)
pub type Price = u32;
/// Share count
pub type Quantity = u32;
/// Exchange-assigned order reference, unique within a session
pub type OrderRef = u64;
/// Exchange-assigned match number, unique within a session
pub type MatchId = u64;

pub const PRICE_SCALE: u32 = 10_000;

pub const HEADER_SIZE: usize = 11;
pub const OFF_STOCK_LOCATE: usize = 1;
pub const OFF_TRACKING_NUMBER: usize = 3;
pub const OFF_TIMESTAMP: usize = 5;

/// Nanoseconds in one day; timestamps are nanoseconds since midnight
pub const NANOS_PER_DAY: u64 = 86_400_000_000_000;

pub const SYMBOL_LEN: usize = 8;

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    SystemEvent = b'S',
    StockDirectory = b'R',
    StockTradingAction = b'H',
    RegShoRestriction = b'Y',
    MarketParticipantPosition = b'L',
    MwcbDeclineLevel = b'V',
    MwcbStatus = b'W',
    IpoQuotingPeriodUpdate = b'K',
    LuldAuctionCollar = b'J',
    OperationalHalt = b'h',
    AddOrder = b'A',
    AddOrderMpid = b'F',
    OrderExecuted = b'E',
    OrderExecutedWithPrice = b'C',
    OrderCancel = b'X',
    OrderDelete = b'D',
    OrderReplace = b'U',
    TradeNonCross = b'P',
    CrossTrade = b'Q',
    BrokenTrade = b'B',
    Noii = b'I',
    Rpii = b'N',
    Dlcr = b'O',
}

impl MessageType {
    pub const ALL: [MessageType; 23] = [
        MessageType::SystemEvent,
        MessageType::StockDirectory,
        MessageType::StockTradingAction,
        MessageType::RegShoRestriction,
        MessageType::MarketParticipantPosition,
        MessageType::MwcbDeclineLevel,
        MessageType::MwcbStatus,
        MessageType::IpoQuotingPeriodUpdate,
        MessageType::LuldAuctionCollar,
        MessageType::OperationalHalt,
        MessageType::AddOrder,
        MessageType::AddOrderMpid,
        MessageType::OrderExecuted,
        MessageType::OrderExecutedWithPrice,
        MessageType::OrderCancel,
        MessageType::OrderDelete,
        MessageType::OrderReplace,
        MessageType::TradeNonCross,
        MessageType::CrossTrade,
        MessageType::BrokenTrade,
        MessageType::Noii,
        MessageType::Rpii,
        MessageType::Dlcr,
    ];

    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            b'S' => Some(MessageType::SystemEvent),
            b'R' => Some(MessageType::StockDirectory),
            b'H' => Some(MessageType::StockTradingAction),
            b'Y' => Some(MessageType::RegShoRestriction),
            b'L' => Some(MessageType::MarketParticipantPosition),
            b'V' => Some(MessageType::MwcbDeclineLevel),
            b'W' => Some(MessageType::MwcbStatus),
            b'K' => Some(MessageType::IpoQuotingPeriodUpdate),
            b'J' => Some(MessageType::LuldAuctionCollar),
            b'h' => Some(MessageType::OperationalHalt),
            b'A' => Some(MessageType::AddOrder),
            b'F' => Some(MessageType::AddOrderMpid),
            b'E' => Some(MessageType::OrderExecuted),
            b'C' => Some(MessageType::OrderExecutedWithPrice),
            b'X' => Some(MessageType::OrderCancel),
            b'D' => Some(MessageType::OrderDelete),
            b'U' => Some(MessageType::OrderReplace),
            b'P' => Some(MessageType::TradeNonCross),
            b'Q' => Some(MessageType::CrossTrade),
            b'B' => Some(MessageType::BrokenTrade),
            b'I' => Some(MessageType::Noii),
            b'N' => Some(MessageType::Rpii),
            b'O' => Some(MessageType::Dlcr),
            _ => None,
        }
    }

    /// Canonical wire length in bytes, tag included. Part of the feed contract.
    pub const fn wire_len(self) -> usize {
        match self {
            MessageType::SystemEvent => 12,
            MessageType::StockDirectory => 39,
            MessageType::StockTradingAction => 25,
            MessageType::RegShoRestriction => 20,
            MessageType::MarketParticipantPosition => 26,
            MessageType::MwcbDeclineLevel => 35,
            MessageType::MwcbStatus => 12,
            MessageType::IpoQuotingPeriodUpdate => 28,
            MessageType::LuldAuctionCollar => 35,
            MessageType::OperationalHalt => 21,
            MessageType::AddOrder => 36,
            MessageType::AddOrderMpid => 40,
            MessageType::OrderExecuted => 31,
            MessageType::OrderExecutedWithPrice => 36,
            MessageType::OrderCancel => 23,
            MessageType::OrderDelete => 19,
            MessageType::OrderReplace => 35,
            MessageType::TradeNonCross => 44,
            MessageType::CrossTrade => 40,
            MessageType::BrokenTrade => 19,
            MessageType::Noii => 50,
            MessageType::Rpii => 20,
            MessageType::Dlcr => 48,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            MessageType::SystemEvent => "system_event",
            MessageType::StockDirectory => "stock_directory",
            MessageType::StockTradingAction => "stock_trading_action",
            MessageType::RegShoRestriction => "reg_sho_restriction",
            MessageType::MarketParticipantPosition => "market_participant_position",
            MessageType::MwcbDeclineLevel => "mwcb_decline_level",
            MessageType::MwcbStatus => "mwcb_status",
            MessageType::IpoQuotingPeriodUpdate => "ipo_quoting_period_update",
            MessageType::LuldAuctionCollar => "luld_auction_collar",
            MessageType::OperationalHalt => "operational_halt",
            MessageType::AddOrder => "add_order",
            MessageType::AddOrderMpid => "add_order_mpid",
            MessageType::OrderExecuted => "order_executed",
            MessageType::OrderExecutedWithPrice => "order_executed_with_price",
            MessageType::OrderCancel => "order_cancel",
            MessageType::OrderDelete => "order_delete",
            MessageType::OrderReplace => "order_replace",
            MessageType::TradeNonCross => "trade",
            MessageType::CrossTrade => "cross_trade",
            MessageType::BrokenTrade => "broken_trade",
            MessageType::Noii => "noii",
            MessageType::Rpii => "rpii",
            MessageType::Dlcr => "dlcr",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Bid,
    Ask,
}

impl Side {
    /// Buy/sell indicator: 'B' = bid, 'S' = ask
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            b'B' => Some(Side::Bid),
            b'S' => Some(Side::Ask),
            _ => None,
        }
    }

    pub fn as_u8(self) -> u8 {
        match self {
            Side::Bid => b'B',
            Side::Ask => b'S',
        }
    }
}

/// Fixed-width, space-padded ASCII field copied out of the wire record
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Alpha<const N: usize>([u8; N]);

impl<const N: usize> Alpha<N> {
    /// Copies exactly `N` bytes; `src` must be at least `N` long.
    pub fn from_wire(src: &[u8]) -> Self {
        let mut raw = [b' '; N];
        raw.copy_from_slice(&src[..N]);
        Alpha(raw)
    }

    /// Left-justify `s` and pad with spaces; anything past `N` bytes is dropped
    pub fn padded(s: &str) -> Self {
        let mut raw = [b' '; N];
        let n = s.len().min(N);
        raw[..n].copy_from_slice(&s.as_bytes()[..n]);
        Alpha(raw)
    }

    pub fn raw(&self) -> &[u8; N] {
        &self.0
    }

    /// Value with right padding removed. Non-ASCII content yields "".
    pub fn as_str(&self) -> &str {
        let mut len = N;
        while len > 0 && self.0[len - 1] == b' ' {
            len -= 1;
        }
        std::str::from_utf8(&self.0[..len]).unwrap_or("")
    }

    pub fn is_blank(&self) -> bool {
        self.as_str().is_empty()
    }
}

impl<const N: usize> Default for Alpha<N> {
    fn default() -> Self {
        Alpha([b' '; N])
    }
}

impl<const N: usize> fmt::Debug for Alpha<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.as_str())
    }
}

impl<const N: usize> fmt::Display for Alpha<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<const N: usize> PartialEq<str> for Alpha<N> {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl<const N: usize> PartialEq<&str> for Alpha<N> {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

pub type Symbol = Alpha<SYMBOL_LEN>;

/// Formats a fixed-point price as dollars with 4 decimals, without going through floats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceDisplay(pub u64);

impl fmt::Display for PriceDisplay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scale = PRICE_SCALE as u64;
        write!(f, "{}.{:04}", self.0 / scale, self.0 % scale)
    }
}

/// Fields common to every record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MessageHeader {
    pub stock_locate: u16,
    pub tracking_number: u16,
    pub timestamp: u64, // ns since midnight, 48 bits on the wire
}

// ---------------------------------------------------------------------------
// Administrative / system records
// ---------------------------------------------------------------------------

/// 'S' - 12 bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SystemEvent {
    pub header: MessageHeader,
    pub event_code: u8, // @11
}

impl SystemEvent {
    pub const START_OF_MESSAGES: u8 = b'O';
    pub const START_OF_SYSTEM_HOURS: u8 = b'S';
    pub const START_OF_MARKET_HOURS: u8 = b'Q';
    pub const END_OF_MARKET_HOURS: u8 = b'M';
    pub const END_OF_SYSTEM_HOURS: u8 = b'E';
    pub const END_OF_MESSAGES: u8 = b'C';

    pub fn is_market_open(&self) -> bool {
        self.event_code == Self::START_OF_MARKET_HOURS
    }
}

/// 'R' - 39 bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockDirectory {
    pub header: MessageHeader,
    pub symbol: Symbol,               // @11
    pub market_category: u8,          // @19
    pub financial_status: u8,         // @20
    pub round_lot_size: u32,          // @21
    pub round_lots_only: u8,          // @25
    pub issue_classification: u8,     // @26
    pub issue_subtype: Alpha<2>,      // @27
    pub authenticity: u8,             // @29
    pub short_sale_threshold: u8,     // @30
    pub ipo_flag: u8,                 // @31
    pub luld_price_tier: u8,          // @32
    pub etp_flag: u8,                 // @33
    pub etp_leverage_factor: u32,     // @34
    pub inverse_indicator: u8,        // @38
}

/// 'H' - 25 bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockTradingAction {
    pub header: MessageHeader,
    pub symbol: Symbol,       // @11
    pub trading_state: u8,    // @19
    pub reserved: u8,         // @20
    pub reason: Alpha<4>,     // @21
}

impl StockTradingAction {
    pub const HALTED: u8 = b'H';
    pub const PAUSED: u8 = b'P';
    pub const QUOTATION_ONLY: u8 = b'Q';
    pub const TRADING: u8 = b'T';

    pub fn is_halted(&self) -> bool {
        self.trading_state == Self::HALTED || self.trading_state == Self::PAUSED
    }
}

/// 'Y' - 20 bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegShoRestriction {
    pub header: MessageHeader,
    pub symbol: Symbol,       // @11
    pub reg_sho_action: u8,   // @19
}

impl RegShoRestriction {
    pub fn is_restricted(&self) -> bool {
        matches!(self.reg_sho_action, b'1' | b'2')
    }
}

/// 'L' - 26 bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarketParticipantPosition {
    pub header: MessageHeader,
    pub mpid: Alpha<4>,                 // @11
    pub symbol: Symbol,                 // @15
    pub primary_market_maker: u8,       // @23
    pub market_maker_mode: u8,          // @24
    pub market_participant_state: u8,   // @25
}

/// 'V' - 35 bytes. Levels carry 8 implied decimals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MwcbDeclineLevel {
    pub header: MessageHeader,
    pub level1: u64, // @11
    pub level2: u64, // @19
    pub level3: u64, // @27
}

/// 'W' - 12 bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MwcbStatus {
    pub header: MessageHeader,
    pub breached_level: u8, // @11
}

/// 'K' - 28 bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IpoQuotingPeriodUpdate {
    pub header: MessageHeader,
    pub symbol: Symbol,               // @11
    pub release_time: u32,            // @19, seconds since midnight
    pub release_qualifier: u8,        // @23
    pub ipo_price: Price,             // @24
}

/// 'J' - 35 bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LuldAuctionCollar {
    pub header: MessageHeader,
    pub symbol: Symbol,               // @11
    pub reference_price: Price,       // @19
    pub upper_collar_price: Price,    // @23
    pub lower_collar_price: Price,    // @27
    pub collar_extension: u32,        // @31
}

/// 'h' - 21 bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationalHalt {
    pub header: MessageHeader,
    pub symbol: Symbol,   // @11
    pub market_code: u8,  // @19
    pub halt_action: u8,  // @20
}

// ---------------------------------------------------------------------------
// Order book mutations
// ---------------------------------------------------------------------------

/// 'A' - 36 bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddOrder {
    pub header: MessageHeader,
    pub order_ref: OrderRef,  // @11
    pub side: u8,             // @19, 'B' or 'S'
    pub shares: Quantity,     // @20
    pub symbol: Symbol,       // @24
    pub price: Price,         // @32
}

impl AddOrder {
    pub fn side(&self) -> Option<Side> {
        Side::from_u8(self.side)
    }
}

/// 'F' - 40 bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddOrderMpid {
    pub header: MessageHeader,
    pub order_ref: OrderRef,  // @11
    pub side: u8,             // @19
    pub shares: Quantity,     // @20
    pub symbol: Symbol,       // @24
    pub price: Price,         // @32
    pub attribution: Alpha<4>, // @36
}

impl AddOrderMpid {
    pub fn side(&self) -> Option<Side> {
        Side::from_u8(self.side)
    }
}

/// 'E' - 31 bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderExecuted {
    pub header: MessageHeader,
    pub order_ref: OrderRef,      // @11
    pub executed_shares: Quantity, // @19
    pub match_number: MatchId,    // @23
}

/// 'C' - 36 bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderExecutedWithPrice {
    pub header: MessageHeader,
    pub order_ref: OrderRef,      // @11
    pub executed_shares: Quantity, // @19
    pub match_number: MatchId,    // @23
    pub printable: u8,            // @31
    pub execution_price: Price,   // @32
}

impl OrderExecutedWithPrice {
    pub fn is_printable(&self) -> bool {
        self.printable == b'Y'
    }
}

/// 'X' - 23 bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderCancel {
    pub header: MessageHeader,
    pub order_ref: OrderRef,        // @11
    pub cancelled_shares: Quantity, // @19
}

/// 'D' - 19 bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderDelete {
    pub header: MessageHeader,
    pub order_ref: OrderRef, // @11
}

/// 'U' - 35 bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderReplace {
    pub header: MessageHeader,
    pub original_ref: OrderRef, // @11
    pub new_ref: OrderRef,      // @19
    pub shares: Quantity,       // @27
    pub price: Price,           // @31
}

// ---------------------------------------------------------------------------
// Trade prints
// ---------------------------------------------------------------------------

/// 'P' - 44 bytes, non-displayed order execution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TradeNonCross {
    pub header: MessageHeader,
    pub order_ref: OrderRef,    // @11
    pub side: u8,               // @19
    pub shares: Quantity,       // @20
    pub symbol: Symbol,         // @24
    pub price: Price,           // @32
    pub match_number: MatchId,  // @36
}

/// 'Q' - 40 bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrossTrade {
    pub header: MessageHeader,
    pub shares: u64,            // @11
    pub symbol: Symbol,         // @19
    pub cross_price: Price,     // @27
    pub match_number: MatchId,  // @31
    pub cross_type: u8,         // @39
}

/// 'B' - 19 bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BrokenTrade {
    pub header: MessageHeader,
    pub match_number: MatchId, // @11
}

// ---------------------------------------------------------------------------
// Imbalance / indicator records
// ---------------------------------------------------------------------------

/// 'I' - 50 bytes, net order imbalance indicator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Noii {
    pub header: MessageHeader,
    pub paired_shares: u64,             // @11
    pub imbalance_shares: u64,          // @19
    pub imbalance_direction: u8,        // @27
    pub symbol: Symbol,                 // @28
    pub far_price: Price,               // @36
    pub near_price: Price,              // @40
    pub current_reference_price: Price, // @44
    pub cross_type: u8,                 // @48
    pub price_variation_indicator: u8,  // @49
}

/// 'N' - 20 bytes, retail price improvement indicator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rpii {
    pub header: MessageHeader,
    pub symbol: Symbol,     // @11
    pub interest_flag: u8,  // @19
}

/// 'O' - 48 bytes, direct listing with capital raise price discovery
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dlcr {
    pub header: MessageHeader,
    pub symbol: Symbol,                   // @11
    pub open_eligibility_status: u8,      // @19
    pub min_allowable_price: Price,       // @20
    pub max_allowable_price: Price,       // @24
    pub near_execution_price: Price,      // @28
    pub near_execution_time: u64,         // @32
    pub lower_price_range_collar: Price,  // @40
    pub upper_price_range_collar: Price,  // @44
}

// Layout sanity: the shared prefix and the widest fixed field positions
const _: () = {
    assert!(HEADER_SIZE == 1 + 2 + 2 + 6);
    assert!(OFF_TIMESTAMP + 6 == HEADER_SIZE);
    assert!(MessageType::CrossTrade.wire_len() == 39 + 1);
    assert!(MessageType::Noii.wire_len() == 49 + 1);
    assert!(MessageType::Dlcr.wire_len() == 44 + 4);
};
