//! Built-in schemas for the standard Java EE descriptors.

use super::{DescriptorSchema, DescriptorTag, Identifier, IdentifierPart};
use crate::node::Element;

impl DescriptorSchema {
    /// Root-level tags of a servlet `web.xml`, in DTD order.
    pub fn web_app() -> Self {
        let keyed = |name: &str, id: &str| DescriptorTag::keyed(name, Identifier::child(id));
        DescriptorSchema::new("web-app")
            .with_tag(DescriptorTag::singleton("icon"))
            .with_tag(DescriptorTag::singleton("display-name"))
            .with_tag(DescriptorTag::singleton("description"))
            .with_tag(DescriptorTag::singleton("distributable"))
            .with_tag(keyed("context-param", "param-name"))
            .with_tag(keyed("filter", "filter-name"))
            .with_tag(keyed("filter-mapping", "filter-name"))
            .with_tag(keyed("listener", "listener-class"))
            .with_tag(keyed("servlet", "servlet-name"))
            .with_tag(DescriptorTag::keyed(
                "servlet-mapping",
                Identifier::Concat(vec![
                    IdentifierPart::Child("servlet-name".into()),
                    IdentifierPart::Literal(" ".into()),
                    IdentifierPart::Child("url-pattern".into()),
                ]),
            ))
            .with_tag(DescriptorTag::singleton("session-config"))
            .with_tag(keyed("mime-mapping", "extension"))
            .with_tag(DescriptorTag::singleton("welcome-file-list"))
            .with_tag(DescriptorTag::keyed(
                "error-page",
                Identifier::Concat(vec![
                    IdentifierPart::Child("error-code".into()),
                    IdentifierPart::Literal(">".into()),
                    IdentifierPart::Child("exception-type".into()),
                ]),
            ))
            .with_tag(keyed("taglib", "taglib-uri"))
            .with_tag(keyed("resource-env-ref", "resource-env-ref-name"))
            .with_tag(keyed("resource-ref", "res-ref-name"))
            .with_tag(DescriptorTag::repeatable("security-constraint"))
            .with_tag(DescriptorTag::singleton("login-config"))
            .with_tag(keyed("security-role", "role-name"))
            .with_tag(DescriptorTag::repeatable("env-entry"))
            .with_tag(keyed("ejb-ref", "ejb-ref-name"))
            .with_tag(keyed("ejb-local-ref", "ejb-ref-name"))
    }

    /// Root-level tags of an EAR `application.xml`.
    pub fn application() -> Self {
        DescriptorSchema::new("application")
            .with_tag(DescriptorTag::singleton("icon"))
            .with_tag(DescriptorTag::singleton("display-name"))
            .with_tag(DescriptorTag::singleton("description"))
            .with_tag(DescriptorTag::keyed(
                "module",
                Identifier::custom(module_key),
            ))
            .with_tag(DescriptorTag::keyed(
                "security-role",
                Identifier::child("role-name"),
            ))
    }
}

/// Keys a `<module>` by its kind and archive, e.g. `ejb:orders.jar` or
/// `web:shop.war`.
fn module_key(module: &Element) -> Option<String> {
    let kind = module.child_elements().next()?;
    let uri = match kind.local_name() {
        "web" => kind.text_at("web-uri")?,
        _ => kind.text_content(),
    };
    Some(format!("{}:{}", kind.local_name(), uri))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::MatchRule;

    #[test]
    fn test_web_app_order() {
        let schema = DescriptorSchema::web_app();
        let servlet = schema.position("servlet").unwrap();
        assert!(schema.position("filter").unwrap() < servlet);
        assert!(servlet < schema.position("servlet-mapping").unwrap());
        assert!(schema.position("security-role").unwrap() < schema.position("env-entry").unwrap());
    }

    #[test]
    fn test_web_app_rules() {
        let schema = DescriptorSchema::web_app();
        assert!(matches!(
            schema.tag("display-name").unwrap().match_rule(),
            MatchRule::Singleton
        ));
        assert!(matches!(
            schema.tag("env-entry").unwrap().match_rule(),
            MatchRule::Concatenate
        ));
        let mapping = Element::new("servlet-mapping")
            .leaf("servlet-name", "foo")
            .leaf("url-pattern", "/foo/*");
        assert_eq!(
            schema.tag("servlet-mapping").unwrap().key_of(&mapping),
            Some("foo /foo/*".to_string())
        );
    }

    #[test]
    fn test_module_key() {
        let web = Element::new("module").child(
            Element::new("web")
                .leaf("web-uri", "shop.war")
                .leaf("context-root", "/shop"),
        );
        let ejb = Element::new("module").leaf("ejb", "orders.jar");
        assert_eq!(module_key(&web), Some("web:shop.war".to_string()));
        assert_eq!(module_key(&ejb), Some("ejb:orders.jar".to_string()));
        assert_eq!(module_key(&Element::new("module")), None);
    }
}
