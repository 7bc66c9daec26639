//! Server-side names and ids the portal expects verbatim.
//!
//! None of these are self-describing: the `j_idt…` ids are generated by the
//! portal's view compiler and change when the server is redeployed with a
//! different page layout. Keep them here so a breakage is a one-file fix.

/// Default portal root.
pub const DEFAULT_BASE_URL: &str = "https://web.isen-ouest.fr";

pub const LOGIN_PATH: &str = "/webAurion/login";
pub const LANDING_PATH: &str = "/webAurion/";
pub const MAIN_MENU_PATH: &str = "/webAurion/faces/MainMenuPage.xhtml";
pub const CATALOG_PAGE_PATH: &str = "/webAurion/faces/ChoixEvenementDUnFormulaire.xhtml";
pub const PLANNING_PATH: &str = "/webAurion/faces/Planning.xhtml";

/// Hidden input carrying the state token.
pub const VIEW_STATE_FIELD: &str = "javax.faces.ViewState";

/// Empty submit button sent along with the credentials.
pub const LOGIN_SUBMIT_FIELD: &str = "j_idt27";

/// Selector field appended to the base payload, with its pinned value.
pub const SELECTOR_FIELD: &str = "form:j_idt820_input";
pub const SELECTOR_VALUE: &str = "275805";

pub const WIDTH_FIELD: &str = "form:largeurDivCenter";
pub const ID_INIT_FIELD: &str = "form:idInit";

/// Sidebar menu.
pub const SIDEBAR: &str = "form:sidebar";
pub const SIDEBAR_MENU_ID: &str = "form:sidebar_menuid";
pub const SIDEBAR_TOGGLE: &str = "form:j_idt52";
pub const SUBMENU_PARAM: &str = "webscolaapp.Sidebar.ID_SUBMENU";
pub const MISC_SUBMENU_LABEL: &str = "Divers";
pub const CATALOG_LABEL: &str = "Catalogue";

/// Catalog listing table.
pub const LISTING_TABLE: &str = "form:j_idt193";
pub const PAGINATION_SELECTOR_FIELD: &str = "form:j_idt267_input";
pub const DETAILS_SELECTOR_FIELD: &str = "form:j_idt265_input";
pub const DETAILS_BUTTON: &str = "j_idt215";

/// Planning widget.
pub const PLANNING_WIDGET: &str = "form:j_idt118";
pub const PLANNING_SELECTOR_FIELD: &str = "form:j_idt244_input";
pub const PLANNING_TZ_OFFSET: &str = "-7200000";

/// Rows per listing page.
pub const PAGE_SIZE: usize = 20;
/// Upper bound on pages walked for a single listing, first page included.
pub const MAX_PAGES: usize = 100;

/// Landing page link labels identifying per-feature actions.
pub const GRADES_LINK_LABEL: &str = "note";
pub const ABSENCES_LINK_LABEL: &str = "Absences";
pub const PLANNING_LINK_LABEL: &str = "Planning";

/// Mail domain used to derive a student's address from the display name.
pub const MAIL_DOMAIN: &str = "isen-ouest.yncrea.fr";

pub const USER_AGENT: &str = "ISENGO https://github.com/CorentinMre/isengo";
