//! In-page extraction scripts.
//!
//! JavaScript evaluated through the driver to pull structured data out of
//! the live page. Result shapes match the `Raw*` types in [`super::node`].

/// Recursively serialize the DOM into `RawDomData` JSON.
///
/// Script-bearing and style elements are skipped; visibility is judged from
/// the computed style plus client rects so `display:none` subtrees come back
/// flagged rather than dropped.
pub const DOM_EXTRACTION_SCRIPT: &str = r#"
    (() => {
        const SKIP = new Set(['script', 'style', 'noscript', 'template']);

        const extract = (el) => {
            const rect = el.getBoundingClientRect();
            const style = window.getComputedStyle(el);
            const visible = style.display !== 'none'
                && style.visibility !== 'hidden'
                && rect.width > 0 && rect.height > 0;

            let ownText = '';
            for (const child of el.childNodes) {
                if (child.nodeType === Node.TEXT_NODE) {
                    ownText += child.textContent;
                }
            }

            const children = [];
            for (const child of el.children) {
                const tag = child.tagName.toLowerCase();
                if (!SKIP.has(tag)) {
                    children.push(extract(child));
                }
            }

            return {
                tag: el.tagName.toLowerCase(),
                id: el.id || null,
                classes: Array.from(el.classList),
                attributes: Object.fromEntries(
                    Array.from(el.attributes).map(attr => [attr.name, attr.value])
                ),
                textContent: ownText.trim(),
                children: children,
                boundingBox: rect.width || rect.height ? {
                    x: Math.max(0, Math.round(rect.x)),
                    y: Math.max(0, Math.round(rect.y)),
                    width: Math.round(rect.width),
                    height: Math.round(rect.height)
                } : null,
                isVisible: visible
            };
        };

        return extract(document.documentElement);
    })()
"#;

/// Walk ARIA attributes into `RawAccessibilityNode` JSON.
pub const ACCESSIBILITY_SCRIPT: &str = r#"
    (() => {
        const roleOf = (el) => {
            const explicit = el.getAttribute('role');
            if (explicit) return explicit;
            const implicit = {
                a: 'link', button: 'button', nav: 'navigation', main: 'main',
                header: 'banner', footer: 'contentinfo', form: 'form',
                input: 'textbox', select: 'combobox', textarea: 'textbox',
                h1: 'heading', h2: 'heading', h3: 'heading',
                h4: 'heading', h5: 'heading', h6: 'heading'
            };
            return implicit[el.tagName.toLowerCase()] || 'generic';
        };

        const nameOf = (el) => {
            const labelled = el.getAttribute('aria-labelledby');
            if (labelled) {
                const target = document.getElementById(labelled.split(/\s+/)[0]);
                if (target) return target.textContent.trim();
            }
            return el.getAttribute('aria-label')
                || el.getAttribute('alt')
                || el.getAttribute('title')
                || '';
        };

        const walk = (el) => ({
            role: roleOf(el),
            name: nameOf(el),
            description: el.getAttribute('aria-description') || '',
            value: el.getAttribute('aria-valuenow') || el.value || null,
            children: Array.from(el.children).map(walk)
        });

        return walk(document.body || document.documentElement);
    })()
"#;

/// Length of `document.body.innerHTML`, the readiness poll measurement.
pub const BODY_LENGTH_SCRIPT: &str =
    "(() => document.body ? document.body.innerHTML.length : 0)()";

/// Current document title.
pub const TITLE_SCRIPT: &str = "(() => document.title || '')()";
