//! Page locator layer.
//!
//! Every selector, XPath and JavaScript snippet the portal integration
//! depends on lives here; a markup change on the portal side touches this
//! file only. The Angular shell (sign-in, navbar, overlay) is addressed with
//! CSS selectors on the main document. The balance-account overview is a
//! legacy page embedded in an iframe, so everything inside it goes through
//! JavaScript that resolves the frame's `contentDocument` first.

pub const SIGN_IN_PATH: &str = "/sign-in";
pub const OVERVIEW_PATH: &str = "/emfamily/BalAccountOverview.do";

/// Substring the page title must carry once the portal has loaded.
pub const TITLE_MARKER: &str = "Market Management System";

/// Wildcard option of the balance-group select, never exported.
pub const GROUP_WILDCARD: &str = "*";

// Sign-in form (Angular Material).
pub const LOGIN_PANEL_HEADER: &str = "#mat-expansion-panel-header-0 span";
pub const USERNAME_INPUT: &str = "#mat-input-0";
pub const PASSWORD_INPUT: &str = "#mat-input-1";
pub const LOGIN_SUBMIT: &str = "#cdk-accordion-child-0 > div > div > button";

// Company-role (account) selection.
pub const ACCOUNT_SELECTOR: &str = "#navbar-top > div:nth-of-type(2) > mms-company-role-selector";
pub const ACCOUNT_OVERLAY: &str = "#cdk-overlay-0";

/// The overview iframe, nested deep in the Angular layout.
pub const OVERVIEW_FRAME: &str = "body > mms-root > mms-full-layout > mat-sidenav-container \
     > mat-sidenav-content > div > mms-emfamily-component > div > mat-card \
     > mat-card-content > iframe";

// In-frame form controls, addressed by `name`.
pub const GROUP_SELECT: &str = "balanceGroupFilter";
pub const DAY_SELECT: &str = "dateTypeChooser.day";
pub const MONTH_SELECT: &str = "dateTypeChooser.month";
pub const YEAR_SELECT: &str = "dateTypeChooser.year";

pub const FILTER_BUTTON_ID: &str = "filterButton";

// In-frame absolute XPaths of the per-group drill-down controls.
pub const CHOICES_LINK_XPATH: &str = "/html/body/div/div/form/div[8]/table/tbody/tr[3]/td[5]/a[1]";
pub const EXPAND_GROUP_XPATH: &str = "/html/body/div/div/form/div[10]/nobr/input[2]";
pub const DOWNLOAD_BUTTON_XPATH: &str = "/html/body/div/div/form/div[7]/div/input[1]";
pub const BACK_LINK_XPATH: &str = "/html/body/div/div/form/div[4]/a";

/// First exact-text match among the scraped option texts.
pub fn exact_match_index(texts: &[String], target: &str) -> Option<usize> {
    texts.iter().position(|text| text == target)
}

/// Balance-group names to process: option texts in DOM order, wildcard
/// excluded.
pub fn filter_group_names<I>(texts: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    texts
        .into_iter()
        .filter(|text| text != GROUP_WILDCARD)
        .collect()
}

/// Wraps a snippet so it runs against the overview frame's document as
/// `doc`, yielding `null` when the frame is not reachable.
fn in_frame(body: &str) -> String {
    format!(
        r#"
        (() => {{
            const frame = document.querySelector("{frame}");
            if (!frame || !frame.contentDocument) return null;
            const doc = frame.contentDocument;
            {body}
        }})()
        "#,
        frame = OVERVIEW_FRAME,
        body = body
    )
}

/// All option texts of an in-frame named select as a JSON string, `null` if
/// absent. Stringified because CDP hands arrays back by reference.
pub fn frame_option_texts_js(select_name: &str) -> String {
    in_frame(&format!(
        r#"
            const sel = doc.getElementsByName('{name}')[0];
            if (!sel) return null;
            return JSON.stringify(Array.from(sel.options).map(o => o.text.trim()));
        "#,
        name = select_name
    ))
}

/// Selects the option at `index` and fires a `change` event, mirroring a
/// user click on the option.
pub fn frame_select_index_js(select_name: &str, index: usize) -> String {
    in_frame(&format!(
        r#"
            const sel = doc.getElementsByName('{name}')[0];
            if (!sel || {index} >= sel.options.length) return false;
            sel.selectedIndex = {index};
            sel.dispatchEvent(new Event('change', {{ bubbles: true }}));
            return true;
        "#,
        name = select_name,
        index = index
    ))
}

pub fn frame_click_id_js(id: &str) -> String {
    in_frame(&format!(
        r#"
            const el = doc.getElementById('{id}');
            if (!el) return false;
            el.click();
            return true;
        "#,
        id = id
    ))
}

pub fn frame_click_xpath_js(xpath: &str) -> String {
    in_frame(&format!(
        r#"
            const hit = doc.evaluate('{xpath}', doc, null,
                XPathResult.FIRST_ORDERED_NODE_TYPE, null).singleNodeValue;
            if (!hit) return false;
            hit.click();
            return true;
        "#,
        xpath = xpath
    ))
}

/// Visible texts of the account options in the company-role overlay as a
/// JSON string, `null` while the overlay has not rendered.
pub fn overlay_option_texts_js() -> String {
    format!(
        r#"
        (() => {{
            const panel = document.querySelector("{overlay}");
            if (!panel) return null;
            return JSON.stringify(Array.from(panel.querySelectorAll('mat-option'))
                .map(o => o.textContent.trim()));
        }})()
        "#,
        overlay = ACCOUNT_OVERLAY
    )
}

pub fn overlay_click_option_js(index: usize) -> String {
    format!(
        r#"
        (() => {{
            const panel = document.querySelector("{overlay}");
            if (!panel) return false;
            const options = panel.querySelectorAll('mat-option');
            if ({index} >= options.length) return false;
            options[{index}].click();
            return true;
        }})()
        "#,
        overlay = ACCOUNT_OVERLAY,
        index = index
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_filter_group_names_drops_wildcard() {
        let names = filter_group_names(texts(&["*", "GROUP_A", "GROUP_B"]));
        assert_eq!(names, vec!["GROUP_A", "GROUP_B"]);
    }

    #[test]
    fn test_filter_group_names_keeps_dom_order() {
        let names = filter_group_names(texts(&["GROUP_B", "*", "GROUP_A", "GROUP_C"]));
        assert_eq!(names, vec!["GROUP_B", "GROUP_A", "GROUP_C"]);
    }

    #[test]
    fn test_exact_match_index() {
        let options = texts(&["*", "GROUP_A", "GROUP_B"]);
        assert_eq!(exact_match_index(&options, "GROUP_B"), Some(2));
        assert_eq!(exact_match_index(&options, "GROUP"), None);
        assert_eq!(exact_match_index(&options, "group_a"), None);
    }

    #[test]
    fn test_frame_js_targets_overview_frame() {
        let js = frame_option_texts_js(GROUP_SELECT);
        assert!(js.contains("mms-emfamily-component"));
        assert!(js.contains("balanceGroupFilter"));

        let js = frame_select_index_js(DAY_SELECT, 3);
        assert!(js.contains("dateTypeChooser.day"));
        assert!(js.contains("selectedIndex = 3"));
    }

    #[test]
    fn test_overlay_js_scopes_to_overlay_panel() {
        assert!(overlay_option_texts_js().contains("#cdk-overlay-0"));
        assert!(overlay_click_option_js(1).contains("mat-option"));
    }
}
