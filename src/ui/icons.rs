pub struct Icons;

impl Icons {
    pub const CHECK: &str = "✅";
    pub const CROSS: &str = "❌";
    pub const WARN: &str = "⚠️";
    pub const STATS: &str = "📊";
    pub const PACKAGE: &str = "📦";
    pub const FUNCTION: &str = "🔧";
    pub const DATABASE: &str = "🗄️";
    pub const REFRESH: &str = "🔄";
    pub const DEL: &str = "🗑️";
    pub const SKIP: &str = "🚫";
    pub const DRY: &str = "🔎";
}
