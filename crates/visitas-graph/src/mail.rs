//! Report delivery mail through the Graph sendMail endpoint.

use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::Local;
use reqwest::StatusCode;
use serde::Serialize;

use crate::{GraphClient, GraphError, GraphResult, GRAPH_BASE};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SendMailRequest {
    message: Message,
    save_to_sent_items: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Message {
    subject: String,
    body: MessageBody,
    to_recipients: Vec<Recipient>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    cc_recipients: Vec<Recipient>,
    attachments: Vec<Attachment>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MessageBody {
    content_type: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Recipient {
    email_address: EmailAddress,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EmailAddress {
    address: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Attachment {
    #[serde(rename = "@odata.type")]
    odata_type: &'static str,
    name: String,
    content_type: &'static str,
    content_bytes: String,
}

fn recipient(address: &str) -> Recipient {
    Recipient {
        email_address: EmailAddress {
            address: address.to_string(),
        },
    }
}

/// Fixed HTML template for the client-facing mail.
fn mail_body(client: &str, technician: &str, date: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="utf-8">
  <style>
    body {{ margin: 0; padding: 0; background-color: #f4f4f4; font-family: 'Segoe UI', Tahoma, sans-serif; }}
    .container {{ max-width: 600px; margin: 20px auto; background: #ffffff; border-radius: 8px; overflow: hidden; }}
    .header {{ background-color: #0583F2; color: #ffffff; padding: 30px 20px; text-align: center; }}
    .header h1 {{ margin: 0; font-size: 24px; text-transform: uppercase; letter-spacing: 1px; }}
    .content {{ padding: 40px 30px; color: #333333; line-height: 1.6; }}
    .card {{ background: #f8f9fa; border-left: 5px solid #0583F2; padding: 20px; margin: 25px 0; border-radius: 4px; }}
    .row {{ display: flex; justify-content: space-between; border-bottom: 1px solid #eee; padding: 5px 0; }}
    .label {{ font-weight: bold; color: #7f8c8d; text-transform: uppercase; font-size: 12px; }}
    .value {{ font-weight: 600; color: #2c3e50; }}
    .footer {{ background: #ecf0f1; padding: 20px; text-align: center; font-size: 12px; color: #95a5a6; }}
  </style>
</head>
<body>
  <div class="container">
    <div class="header"><h1>Reporte Técnico</h1></div>
    <div class="content">
      <p>Estimados <strong>{client}</strong>,</p>
      <p>Se ha completado una visita técnica en sus instalaciones. Adjunto
      encontrará el informe detallado con las actividades realizadas,
      evidencias y conformidad del servicio.</p>
      <div class="card">
        <div class="row"><span class="label">Fecha del Servicio</span><span class="value">{date}</span></div>
        <div class="row"><span class="label">Técnico Responsable</span><span class="value">{technician}</span></div>
        <div class="row"><span class="label">Estado</span><span class="value" style="color:#27ae60;">Finalizado con Éxito</span></div>
      </div>
      <p style="text-align:center; font-size:14px; color:#7f8c8d;">El documento PDF adjunto contiene el detalle completo.</p>
      <p style="margin-top:40px; border-top:1px solid #eee; padding-top:20px;">Atentamente,<br><strong>Equipo de Soporte</strong></p>
    </div>
    <div class="footer">
      <p>Este es un mensaje automático, por favor no responder a esta dirección.</p>
      <p>La información contenida en este mensaje es confidencial.</p>
    </div>
  </div>
</body>
</html>"#
    )
}

impl GraphClient {
    /// Send the rendered report to the client, optionally copying the
    /// technician. The sendMail endpoint acknowledges with 202.
    pub async fn send_report_mail(
        &self,
        pdf_path: &Path,
        client: &str,
        technician: &str,
        recipient_address: &str,
        cc_address: Option<&str>,
    ) -> GraphResult<()> {
        if !pdf_path.exists() {
            return Err(GraphError::MissingFile(pdf_path.display().to_string()));
        }

        let token = self.acquire_token().await?;
        let content_bytes = STANDARD.encode(tokio::fs::read(pdf_path).await?);
        let date = Local::now().format("%d/%m/%Y").to_string();

        let request = SendMailRequest {
            message: Message {
                subject: format!("Reporte de Visita - {client} - {date}"),
                body: MessageBody {
                    content_type: "HTML",
                    content: mail_body(client, technician, &date),
                },
                to_recipients: vec![recipient(recipient_address)],
                cc_recipients: cc_address.map(recipient).into_iter().collect(),
                attachments: vec![Attachment {
                    odata_type: "#microsoft.graph.fileAttachment",
                    name: pdf_path
                        .file_name()
                        .map(|name| name.to_string_lossy().into_owned())
                        .unwrap_or_else(|| "reporte.pdf".to_string()),
                    content_type: "application/pdf",
                    content_bytes,
                }],
            },
            save_to_sent_items: true,
        };

        let url = format!("{GRAPH_BASE}/users/{}/sendMail", self.config.sender);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&token)
            .json(&request)
            .send()
            .await?;

        if response.status() != StatusCode::ACCEPTED {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            return Err(GraphError::Mail(format!("{status} {detail}")));
        }

        tracing::info!("report mail sent to {recipient_address}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_matches_graph_wire_names() {
        let request = SendMailRequest {
            message: Message {
                subject: "Reporte de Visita - Acme - 05/03/2026".into(),
                body: MessageBody {
                    content_type: "HTML",
                    content: mail_body("Acme", "Ana", "05/03/2026"),
                },
                to_recipients: vec![recipient("contacto@acme.cl")],
                cc_recipients: vec![],
                attachments: vec![Attachment {
                    odata_type: "#microsoft.graph.fileAttachment",
                    name: "reporte.pdf".into(),
                    content_type: "application/pdf",
                    content_bytes: STANDARD.encode(b"pdf"),
                }],
            },
            save_to_sent_items: true,
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value["message"]["toRecipients"][0]["emailAddress"]["address"],
            "contacto@acme.cl"
        );
        assert_eq!(
            value["message"]["attachments"][0]["@odata.type"],
            "#microsoft.graph.fileAttachment"
        );
        assert_eq!(value["message"]["attachments"][0]["contentBytes"], "cGRm");
        assert_eq!(value["saveToSentItems"], true);
        // empty CC list is omitted entirely
        assert!(value["message"].get("ccRecipients").is_none());
    }

    #[test]
    fn body_embeds_client_and_technician() {
        let body = mail_body("Acme", "Ana Rojas", "05/03/2026");
        assert!(body.contains("Estimados <strong>Acme</strong>"));
        assert!(body.contains("Ana Rojas"));
        assert!(body.contains("05/03/2026"));
    }
}
