#[derive(Debug)]
pub struct ApiUrls;

impl ApiUrls {
    pub const HEALTH: &'static str = "/api/health";
    pub const ME: &'static str = "/api/me";

    // Projects
    pub const PROJECTS: &'static str = "/api/projects";
    pub const PROJECT_BY_ID: &'static str = "/api/projects/:id";
    pub const PROJECT_STATUS: &'static str = "/api/projects/:id/status";
    pub const PROJECT_MOVE: &'static str = "/api/projects/:id/move";
    pub const PROJECT_WEATHER: &'static str = "/api/projects/:id/weather";
    pub const PROJECTS_ORDER: &'static str = "/api/projects/order";

    // TBM
    pub const TBM: &'static str = "/api/tbm";
    pub const TBM_BY_ID: &'static str = "/api/tbm/:id";
    pub const TBM_SUMMARY: &'static str = "/api/tbm/summary";

    // Inspections
    pub const INSPECTIONS: &'static str = "/api/inspections";
    pub const INSPECTION_SIGN: &'static str = "/api/inspections/:id/sign";
    pub const INSPECTIONS_BULK_SIGN: &'static str = "/api/inspections/bulk-sign";

    // Heat wave
    pub const HEAT_WAVE: &'static str = "/api/heat-wave";
    pub const HEAT_WAVE_SUMMARY: &'static str = "/api/heat-wave/summary";

    // External proxies
    pub const GEOCODING: &'static str = "/api/geocoding";
    pub const WEATHER_CRAWL: &'static str = "/api/weather-crawl";
    pub const AI_CHAT: &'static str = "/api/ai/chat";
    pub const AI_OCR: &'static str = "/api/ai/ocr";
    pub const AI_TTS: &'static str = "/api/ai/tts";
    pub const AI_GENERATE: &'static str = "/api/ai/generate";
    pub const TELEGRAM: &'static str = "/api/telegram";

    // Reports
    pub const REPORT_TBM: &'static str = "/api/reports/tbm";
    pub const REPORT_INSPECTIONS: &'static str = "/api/reports/inspections";
    pub const REPORT_HEAT_WAVE: &'static str = "/api/reports/heat-wave";
}
