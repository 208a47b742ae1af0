use std::fmt::{self, Write};

use crate::spec::ResourceSpec;

/// Label of the rendered `aws_s3_bucket` resource.
pub const RESOURCE_LABEL: &str = "b";

/// Render the spec as Terraform HCL: a `provider "aws"` block and one
/// `aws_s3_bucket` resource. Undeclared blocks are left out.
pub fn terraform(spec: &ResourceSpec, region: &str) -> Result<String, fmt::Error> {
    let mut out = String::new();
    write_hcl(&mut out, spec, region)?;
    Ok(out)
}

fn write_hcl(out: &mut String, spec: &ResourceSpec, region: &str) -> fmt::Result {
    writeln!(out, "provider \"aws\" {{")?;
    writeln!(out, "  region = {}", quote(region))?;
    writeln!(out, "}}")?;
    writeln!(out)?;
    writeln!(out, "resource \"aws_s3_bucket\" \"{RESOURCE_LABEL}\" {{")?;
    writeln!(out, "  bucket = {}", quote(&spec.bucket))?;
    writeln!(out, "  acl    = {}", quote(spec.acl.as_str()))?;

    if let Some(versioning) = spec.versioning {
        writeln!(out)?;
        writeln!(out, "  versioning {{")?;
        writeln!(out, "    enabled = {}", versioning.enabled)?;
        writeln!(out, "  }}")?;
    }

    if let Some(logging) = &spec.logging {
        writeln!(out)?;
        writeln!(out, "  logging {{")?;
        writeln!(out, "    target_bucket = {}", quote(&logging.target_bucket))?;
        writeln!(out, "    target_prefix = {}", quote(&logging.target_prefix))?;
        writeln!(out, "  }}")?;
    }

    if let Some(encryption) = &spec.encryption {
        writeln!(out)?;
        writeln!(out, "  server_side_encryption_configuration {{")?;
        writeln!(out, "    rule {{")?;
        writeln!(out, "      apply_server_side_encryption_by_default {{")?;
        writeln!(
            out,
            "        sse_algorithm = {}",
            quote(encryption.algorithm.as_str())
        )?;
        if let Some(key_id) = &encryption.kms_master_key_id {
            writeln!(out, "        kms_master_key_id = {}", quote(key_id))?;
        }
        writeln!(out, "      }}")?;
        writeln!(out, "    }}")?;
        writeln!(out, "  }}")?;
    }

    if let Some(retention) = spec.object_lock {
        writeln!(out)?;
        writeln!(out, "  object_lock_configuration {{")?;
        writeln!(out, "    object_lock_enabled = \"Enabled\"")?;
        writeln!(out, "    rule {{")?;
        writeln!(out, "      default_retention {{")?;
        writeln!(out, "        mode = {}", quote(retention.mode.as_str()))?;
        writeln!(out, "        days = {}", retention.days)?;
        writeln!(out, "      }}")?;
        writeln!(out, "    }}")?;
        writeln!(out, "  }}")?;
    }

    writeln!(out, "}}")
}

fn quote(value: &str) -> String {
    let escaped = value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace("${", "$${");
    format!("\"{escaped}\"")
}
