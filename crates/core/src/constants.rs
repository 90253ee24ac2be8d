use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Decimal places kept for ledger amounts (transactions, budgets, balances)
pub const LEDGER_SCALE: u32 = 2;

/// Decimal places kept for share ratios, thresholds and percentages
pub const RATIO_SCALE: u32 = 4;

/// Currency used when a transaction does not name one
pub const DEFAULT_CURRENCY: &str = "USD";

/// Alert threshold assigned to budgets created without one
pub const DEFAULT_ALERT_THRESHOLD: Decimal = dec!(0.80);

/// Tolerance applied to share-ratio sums
pub const RATIO_EPSILON: Decimal = dec!(0.0001);

/// Field length limits
pub const MAX_TITLE_LEN: usize = 120;
pub const MAX_CATEGORY_LEN: usize = 60;
pub const MAX_NOTE_LEN: usize = 1024;
pub const MAX_ATTACHMENT_URL_LEN: usize = 255;
pub const MAX_WALLET_NAME_LEN: usize = 120;
pub const MAX_NOTIFICATION_MESSAGE_LEN: usize = 1024;

/// Owners processed concurrently by one recurring-job batch
pub const DEFAULT_RUNNER_CONCURRENCY: usize = 4;
