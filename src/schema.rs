//! Column-name constants for the sales dashboard tables.
//! Single source of truth - every aggregation refers to columns through here.

// ── Processed transaction columns ───────────────────────────────────────────
pub mod sales {
    pub const ORDER_DATE: &str = "Order Date";
    pub const CATEGORY: &str = "Category";
    pub const SUB_CATEGORY: &str = "Sub-Category";
    pub const COUNTRY: &str = "Country";
    pub const REGION: &str = "Region";
    pub const MARKET: &str = "Market";
    pub const QUANTITY: &str = "Quantity";
    pub const SALES: &str = "Sales";
    pub const TOTAL_SALES: &str = "Total_sales";
    pub const PROFIT: &str = "Profit";
    pub const DISCOUNT: &str = "Discount";
    pub const SHIPPING_DAYS: &str = "Shipping Time (Days)";

    pub const REQUIRED: [&str; 11] = [
        ORDER_DATE,
        CATEGORY,
        SUB_CATEGORY,
        COUNTRY,
        REGION,
        MARKET,
        QUANTITY,
        TOTAL_SALES,
        PROFIT,
        DISCOUNT,
        SHIPPING_DAYS,
    ];

    pub const NUMERIC: [&str; 5] = [QUANTITY, TOTAL_SALES, PROFIT, DISCOUNT, SHIPPING_DAYS];
}

// ── Raw transaction columns ─────────────────────────────────────────────────
pub mod raw {
    pub const DISCOUNT: &str = "Discount";
}

// ── Columns derived at load time ────────────────────────────────────────────
pub mod derived {
    /// Calendar month of the order date, 1..=12.
    pub const MONTH: &str = "Month";
    /// ISO weekday of the order date, Monday = 1 .. Sunday = 7.
    pub const WEEKDAY: &str = "Weekday";
    /// Order date as days since the Unix epoch.
    pub const ORDER_DAY: &str = "Order Day";
}

// ── Columns produced by aggregations ────────────────────────────────────────
pub mod output {
    pub const MOVING_AVG: &str = "Moving_Avg";
    pub const DAY_OF_WEEK: &str = "Day of Week";
}
