//! Appends QEMU command-line arguments taken from VMI annotations to a
//! libvirt domain.
//!
//! Every annotation `arg.commandline.vm.kubevirt.io/<flag>: <value>` becomes
//! one `<qemu:arg value="-<flag>=<value>"/>` after the arguments already in
//! the domain. Existing arguments are never removed, reordered or
//! deduplicated.

use crate::error::{InjectionError, PathError};
use crate::path::Path;
use crate::tree::{Document, Element};
use crate::vmi::VirtualMachineInstance;
use std::collections::BTreeMap;

pub const ANNOTATION_PREFIX: &str = "arg.commandline.vm.kubevirt.io/";

pub const ARGUMENTS_PATH: &str = "domain.qemu:commandline.qemu:arg";

pub const QEMU_NAMESPACE: &str = "http://libvirt.org/schemas/domain/qemu/1.0";

const QEMU_NAMESPACE_ATTRIBUTE: &str = "xmlns:qemu";
const ARGUMENT_ELEMENT: &str = "qemu:arg";
const ARGUMENT_VALUE: &str = "value";

/// Outcome of a successful injection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Injection {
    pub domain_xml: String,
    /// `namespace/name` of the VMI the annotations came from, if known.
    pub vmi: Option<String>,
    /// Number of arguments the domain carried before.
    pub existing: usize,
    /// Arguments appended, in order.
    pub injected: Vec<String>,
}

/// Command-line tokens for every annotation carrying the argument prefix,
/// in the map's iteration order.
pub fn derive_arguments<'a, I>(annotations: I) -> Vec<String>
where
    I: IntoIterator<Item = (&'a String, &'a String)>,
{
    annotations
        .into_iter()
        .filter_map(|(key, value)| {
            key.strip_prefix(ANNOTATION_PREFIX)
                .map(|flag| format!("-{flag}={value}"))
        })
        .collect()
}

pub fn inject(
    annotations: &BTreeMap<String, String>,
    domain_xml: &str,
) -> Result<Injection, InjectionError> {
    let mut domain = Document::parse(domain_xml)?;
    inject_into(&mut domain, annotations, None)
}

/// Decode the VMI sent by virt-launcher and inject its arguments into the
/// domain.
pub fn define_domain(vmi_json: &[u8], domain_xml: &[u8]) -> Result<Injection, InjectionError> {
    let vmi = VirtualMachineInstance::from_json(vmi_json)?;
    let mut domain = Document::parse_bytes(domain_xml)?;
    inject_into(&mut domain, vmi.annotations(), Some(vmi.display_name()))
}

fn inject_into(
    domain: &mut Document,
    annotations: &BTreeMap<String, String>,
    vmi: Option<String>,
) -> Result<Injection, InjectionError> {
    let path: Path = ARGUMENTS_PATH.parse()?;

    // No qemu:commandline block just means no arguments yet.
    let mut arguments: Vec<Element> = match domain.values_at(&path) {
        Ok(existing) => existing.into_iter().cloned().collect(),
        Err(PathError::Missing { .. }) => Vec::new(),
        Err(e) => return Err(e.into()),
    };
    let existing = arguments.len();

    let injected = derive_arguments(annotations);
    if !injected.is_empty() {
        arguments.extend(
            injected
                .iter()
                .map(|arg| Element::new(ARGUMENT_ELEMENT).with_attribute(ARGUMENT_VALUE, arg)),
        );
        domain.replace_at(&path, arguments)?;

        if domain.root.attribute(QEMU_NAMESPACE_ATTRIBUTE).is_none() {
            domain
                .root
                .set_attribute(QEMU_NAMESPACE_ATTRIBUTE, QEMU_NAMESPACE);
        }
    }

    Ok(Injection {
        domain_xml: domain.to_xml(),
        vmi,
        existing,
        injected,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ParseError;

    const DOMAIN_WITH_ARGS: &str = r#"<domain type="kvm" xmlns:qemu="http://libvirt.org/schemas/domain/qemu/1.0">
  <name>default_testvmi</name>
  <vcpu placement="static">1</vcpu>
  <qemu:commandline>
    <qemu:arg value="-cpu host"/>
  </qemu:commandline>
</domain>"#;

    const DOMAIN_WITHOUT_ARGS: &str = r#"<domain type="kvm">
  <name>default_testvmi</name>
  <devices>
    <emulator>/usr/libexec/qemu-kvm</emulator>
  </devices>
</domain>"#;

    fn annotations(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn arguments(xml: &str) -> Vec<String> {
        let doc = Document::parse(xml).unwrap();
        doc.values_at(&ARGUMENTS_PATH.parse().unwrap())
            .unwrap()
            .into_iter()
            .map(|arg| arg.attribute("value").unwrap().to_string())
            .collect()
    }

    #[test]
    fn test_appends_after_existing() {
        let result = inject(
            &annotations(&[("arg.commandline.vm.kubevirt.io/smp", "4")]),
            DOMAIN_WITH_ARGS,
        )
        .unwrap();

        assert_eq!(arguments(&result.domain_xml), ["-cpu host", "-smp=4"]);
        assert_eq!(result.existing, 1);
        assert_eq!(result.injected, ["-smp=4"]);
    }

    #[test]
    fn test_empty_annotations_pass_through() {
        for domain in [DOMAIN_WITH_ARGS, DOMAIN_WITHOUT_ARGS] {
            let result = inject(&BTreeMap::new(), domain).unwrap();
            assert_eq!(
                Document::parse(&result.domain_xml).unwrap(),
                Document::parse(domain).unwrap()
            );
            assert!(result.injected.is_empty());
        }
    }

    #[test]
    fn test_missing_commandline_block() {
        let result = inject(
            &annotations(&[
                ("arg.commandline.vm.kubevirt.io/smp", "4"),
                ("arg.commandline.vm.kubevirt.io/machine", "q35"),
            ]),
            DOMAIN_WITHOUT_ARGS,
        )
        .unwrap();

        assert_eq!(result.existing, 0);
        assert_eq!(arguments(&result.domain_xml), ["-machine=q35", "-smp=4"]);

        let doc = Document::parse(&result.domain_xml).unwrap();
        assert_eq!(doc.root.attribute("xmlns:qemu"), Some(QEMU_NAMESPACE));
        assert_eq!(doc.root.attribute("type"), Some("kvm"));
        let names: Vec<&str> = doc.root.elements().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["name", "devices", "qemu:commandline"]);
    }

    #[test]
    fn test_empty_commandline_block() {
        let domain = r#"<domain xmlns:qemu="urn:custom"><qemu:commandline/></domain>"#;
        let result = inject(
            &annotations(&[("arg.commandline.vm.kubevirt.io/smp", "2")]),
            domain,
        )
        .unwrap();

        assert_eq!(arguments(&result.domain_xml), ["-smp=2"]);
        let doc = Document::parse(&result.domain_xml).unwrap();
        assert_eq!(doc.root.attribute("xmlns:qemu"), Some("urn:custom"));
    }

    #[test]
    fn test_prefix_filtering() {
        let result = inject(
            &annotations(&[
                ("other.prefix/foo", "bar"),
                ("arg.commandline.vm.kubevirt.io/smp", "4"),
                ("commandline.vm.kubevirt.io/m", "1G"),
            ]),
            DOMAIN_WITH_ARGS,
        )
        .unwrap();

        assert_eq!(result.injected, ["-smp=4"]);
        assert_eq!(arguments(&result.domain_xml), ["-cpu host", "-smp=4"]);
    }

    #[test]
    fn test_append_only_keeps_existing_order_and_duplicates() {
        let domain = r#"<domain xmlns:qemu="http://libvirt.org/schemas/domain/qemu/1.0">
  <qemu:commandline>
    <qemu:arg value="-smp=4"/>
    <qemu:arg value="-cpu"/>
    <qemu:arg value="host"/>
  </qemu:commandline>
</domain>"#;
        let result = inject(
            &annotations(&[
                ("arg.commandline.vm.kubevirt.io/smp", "4"),
                ("arg.commandline.vm.kubevirt.io/boot", "menu=on"),
            ]),
            domain,
        )
        .unwrap();

        assert_eq!(
            arguments(&result.domain_xml),
            ["-smp=4", "-cpu", "host", "-boot=menu=on", "-smp=4"]
        );
    }

    #[test]
    fn test_untouched_content_round_trips() {
        let result = inject(
            &annotations(&[("arg.commandline.vm.kubevirt.io/smp", "4")]),
            DOMAIN_WITH_ARGS,
        )
        .unwrap();

        let before = Document::parse(DOMAIN_WITH_ARGS).unwrap();
        let after = Document::parse(&result.domain_xml).unwrap();
        assert_eq!(before.root.attributes, after.root.attributes);
        assert_eq!(
            before.root.elements().take(2).collect::<Vec<_>>(),
            after.root.elements().take(2).collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_line_breaks_in_values_are_encoded() {
        let domain = r#"<domain><description note="a&#10;b"/></domain>"#;
        let result = inject(
            &annotations(&[("arg.commandline.vm.kubevirt.io/append", "console=ttyS0\nquiet")]),
            domain,
        )
        .unwrap();

        assert!(!result.domain_xml.contains("a\nb"), "{}", result.domain_xml);
        assert!(!result.domain_xml.contains("ttyS0\nquiet"), "{}", result.domain_xml);
        assert!(result.domain_xml.contains(r#"value="-append=console=ttyS0&#10;quiet""#));
        assert_eq!(arguments(&result.domain_xml), ["-append=console=ttyS0\nquiet"]);

        let doc = Document::parse(&result.domain_xml).unwrap();
        let description = doc.root.children_named("description").next().unwrap();
        assert_eq!(description.attribute("note"), Some("a\nb"));
    }

    #[test]
    fn test_mixed_metadata_passes_through() {
        let domain = "<domain><metadata><p><b>x</b> <i>y</i></p></metadata></domain>";
        let result = inject(&BTreeMap::new(), domain).unwrap();
        assert!(
            result.domain_xml.contains("<p><b>x</b> <i>y</i></p>"),
            "{}",
            result.domain_xml
        );
        assert_eq!(
            Document::parse(&result.domain_xml).unwrap(),
            Document::parse(domain).unwrap()
        );
    }

    #[test]
    fn test_malformed_domain() {
        let err = inject(
            &annotations(&[("arg.commandline.vm.kubevirt.io/smp", "4")]),
            "<domain><qemu:commandline>",
        )
        .unwrap_err();
        assert!(matches!(err, InjectionError::Parse(_)));
    }

    #[test]
    fn test_wrong_root_is_fatal() {
        let err = inject(
            &annotations(&[("arg.commandline.vm.kubevirt.io/smp", "4")]),
            "<network><name>default</name></network>",
        )
        .unwrap_err();
        assert!(matches!(
            err,
            InjectionError::Path(PathError::RootMismatch { .. })
        ));
    }

    #[test]
    fn test_derive_arguments() {
        let map = annotations(&[
            ("arg.commandline.vm.kubevirt.io/smp", "4"),
            ("arg.commandline.vm.kubevirt.io/machine", "q35,accel=kvm"),
            ("vm.kubevirt.io/flavor", "small"),
        ]);
        assert_eq!(derive_arguments(&map), ["-machine=q35,accel=kvm", "-smp=4"]);
    }

    #[test]
    fn test_define_domain() {
        let vmi = br#"{"metadata": {"name": "testvmi", "namespace": "default", "annotations": {"arg.commandline.vm.kubevirt.io/smp": "4"}}}"#;
        let result = define_domain(vmi, DOMAIN_WITH_ARGS.as_bytes()).unwrap();
        assert_eq!(arguments(&result.domain_xml), ["-cpu host", "-smp=4"]);
        assert_eq!(result.vmi.as_deref(), Some("default/testvmi"));

        let result = inject(&BTreeMap::new(), DOMAIN_WITH_ARGS).unwrap();
        assert_eq!(result.vmi, None);
    }

    #[test]
    fn test_define_domain_errors() {
        let err = define_domain(b"not json", DOMAIN_WITH_ARGS.as_bytes()).unwrap_err();
        assert!(matches!(err, InjectionError::Decoding(_)));

        let err = define_domain(b"{}", b"\xfe\xff").unwrap_err();
        assert!(matches!(err, InjectionError::Parse(ParseError::Encoding(_))));
    }
}
