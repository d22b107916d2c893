//! ---
//! rk_section: "06-orchestration"
//! rk_subsection: "module"
//! rk_type: "source"
//! rk_scope: "code"
//! rk_description: "Cluster migration state machine and its command surface."
//! rk_version: "v0.0.0-prealpha"
//! rk_owner: "tbd"
//! ---
//! Static checks run before a draft may become ready.
use std::collections::HashSet;

use rollkit_migrator::{MigratorSettings, MIGRATORS_PATH};
use rollkit_model::{Configuration, ErrorDescription, PackageRequirement};

/// Every problem found in `configuration`. An empty list means it may be made ready.
pub fn check_configuration(configuration: &Configuration) -> Vec<ErrorDescription> {
    let settings = &configuration.settings;
    let mut errors = Vec::new();

    if settings.node_templates.is_empty() {
        errors.push(ErrorDescription::new(
            "configuration.nodeTemplates",
            "Node templates are not initialized",
        ));
    }
    if settings.migrator_templates.is_empty() {
        errors.push(ErrorDescription::new(
            "configuration.migratorTemplates",
            "Migrator templates are not initialized",
        ));
    }
    if settings.packages.is_empty() {
        errors.push(ErrorDescription::new(
            "configuration.packages",
            "Packages are not initialized",
        ));
    }

    let packages: HashSet<&str> = settings.packages.iter().map(|p| p.id.as_str()).collect();

    for template in &settings.node_templates {
        let field = format!("configuration.nodeTemplates[\"{}\"]", template.code);
        check_requirements(&field, &template.package_requirements, &packages, &mut errors);
    }

    for template in &settings.migrator_templates {
        let field = format!("configuration.migratorTemplates[\"{}\"]", template.code);
        match MigratorSettings::parse(&template.configuration) {
            Err(_) => errors.push(ErrorDescription::new(
                format!("{field}.configuration"),
                "Configuration could not be parsed",
            )),
            Ok(parsed) if parsed.value(MIGRATORS_PATH).is_none() => errors.push(
                ErrorDescription::new(format!("{field}.configuration"), "Migrators are not declared"),
            ),
            Ok(_) => {}
        }
        check_requirements(&field, &template.package_requirements, &packages, &mut errors);
    }

    errors
}

fn check_requirements(
    field: &str,
    requirements: &[PackageRequirement],
    packages: &HashSet<&str>,
    errors: &mut Vec<ErrorDescription>,
) {
    if requirements.is_empty() {
        errors.push(ErrorDescription::new(field, "Package requirements are not set"));
        return;
    }
    for requirement in requirements {
        if !packages.contains(requirement.id.as_str()) {
            errors.push(ErrorDescription::new(
                format!("{field}.packageRequirements[\"{}\"]", requirement.id),
                "Package requirement is not defined in configuration packages",
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rollkit_model::{
        ConfigurationSettings, MigratorTemplate, NodeTemplate, PackageDescription,
    };

    fn requirement(id: &str) -> PackageRequirement {
        PackageRequirement {
            id: id.into(),
            specific_version: None,
        }
    }

    fn valid() -> Configuration {
        let settings = ConfigurationSettings {
            node_templates: vec![NodeTemplate {
                code: "worker".into(),
                name: "Worker".into(),
                configuration: String::new(),
                package_requirements: vec![requirement("core")],
                minimum_required_instances: 1,
                maximum_needed_instances: None,
                priority: 1.0,
            }],
            migrator_templates: vec![MigratorTemplate {
                code: "storage".into(),
                name: "Storage".into(),
                configuration: "[rollkit]\nmigrators = [\"file-marker\"]\n".into(),
                notes: None,
                priority: 1.0,
                package_requirements: vec![requirement("core")],
                executor: None,
            }],
            packages: vec![PackageDescription {
                id: "core".into(),
                version: "1.0.0".into(),
            }],
        };
        Configuration::draft(1, "release", settings)
    }

    fn fields(errors: &[ErrorDescription]) -> Vec<(&str, &str)> {
        errors
            .iter()
            .map(|e| (e.field.as_deref().unwrap_or(""), e.message.as_str()))
            .collect()
    }

    #[test]
    fn valid_configuration_has_no_errors() {
        assert!(check_configuration(&valid()).is_empty());
    }

    #[test]
    fn empty_settings_report_each_list() {
        let configuration = Configuration::draft(1, "empty", ConfigurationSettings::default());
        assert_eq!(
            fields(&check_configuration(&configuration)),
            vec![
                ("configuration.nodeTemplates", "Node templates are not initialized"),
                ("configuration.migratorTemplates", "Migrator templates are not initialized"),
                ("configuration.packages", "Packages are not initialized"),
            ]
        );
    }

    #[test]
    fn migrator_template_problems_are_addressed_by_code() {
        let mut configuration = valid();
        let template = &mut configuration.settings.migrator_templates[0];
        template.configuration = "[rollkit".into();
        template.package_requirements = vec![requirement("missing")];
        assert_eq!(
            fields(&check_configuration(&configuration)),
            vec![
                (
                    "configuration.migratorTemplates[\"storage\"].configuration",
                    "Configuration could not be parsed"
                ),
                (
                    "configuration.migratorTemplates[\"storage\"].packageRequirements[\"missing\"]",
                    "Package requirement is not defined in configuration packages"
                ),
            ]
        );
    }

    #[test]
    fn undeclared_migrators_and_requirements() {
        let mut configuration = valid();
        let template = &mut configuration.settings.migrator_templates[0];
        template.configuration = "[file_marker]\nname = \"x\"\n".into();
        template.package_requirements.clear();
        assert_eq!(
            fields(&check_configuration(&configuration)),
            vec![
                (
                    "configuration.migratorTemplates[\"storage\"].configuration",
                    "Migrators are not declared"
                ),
                (
                    "configuration.migratorTemplates[\"storage\"]",
                    "Package requirements are not set"
                ),
            ]
        );
    }
}
