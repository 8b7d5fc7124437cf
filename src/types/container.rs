use k8s_openapi::api::core::v1 as k8s;

#[derive(Clone, Debug)]
pub struct Container {
    pub name: String,
    pub image: String,
    pub ports: Vec<ContainerPort>,
}

impl Container {
    pub fn new(name: impl Into<String>, image: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            image: image.into(),
            ports: Vec::new(),
        }
    }

    pub fn named_port(mut self, name: impl Into<String>, port: i32) -> Self {
        self.ports.push(ContainerPort {
            container_port: port,
            name: Some(name.into()),
        });
        self
    }

    pub fn into_k8s(self) -> k8s::Container {
        k8s::Container {
            name: self.name,
            image: Some(self.image),
            ports: if self.ports.is_empty() {
                None
            } else {
                Some(self.ports.into_iter().map(ContainerPort::into_k8s).collect())
            },
            ..Default::default()
        }
    }
}

#[derive(Clone, Debug)]
pub struct ContainerPort {
    pub container_port: i32,
    pub name: Option<String>,
}

impl ContainerPort {
    pub fn into_k8s(self) -> k8s::ContainerPort {
        k8s::ContainerPort {
            container_port: self.container_port,
            name: self.name,
            protocol: Some("TCP".to_string()),
            ..Default::default()
        }
    }
}
